// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Click and double-click recognition.
//!
//! A click is a primary press inside the component followed by a release that stays within
//! [`ClickConfig::slop`] of the press. Once the pointer wanders further than that, the press
//! can no longer become a click, even if it comes back. A second click close to the first,
//! in space and time, is reported as a double click instead of a click.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use kurbo::Point;
use trellis_data::{CallbackSet, ListenerId};
use trellis_layout::{InputEvent, Interaction, Outcome, PointerButton, Target};

/// Tolerances for click recognition.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClickConfig {
    /// How far, in pixels, the pointer may travel between press and release.
    pub slop: f64,
    /// Longest gap, in milliseconds, between the two clicks of a double click.
    pub double_click_window: f64,
}

impl Default for ClickConfig {
    fn default() -> Self {
        Self {
            slop: 4.0,
            double_click_window: 500.0,
        }
    }
}

#[derive(Copy, Clone, Debug)]
struct Press {
    position: Point,
    distance_exceeded: bool,
}

#[derive(Copy, Clone, Debug)]
struct LastClick {
    position: Point,
    time: f64,
}

struct Shared {
    config: Cell<ClickConfig>,
    press: Cell<Option<Press>>,
    last_click: Cell<Option<LastClick>>,
    click: CallbackSet<Point>,
    double_click: CallbackSet<Point>,
}

/// Reports clicks and double clicks in the component's local coordinates.
///
/// Cheap to clone; clones share callbacks and gesture state, so a handle kept after
/// attaching can still register listeners.
#[derive(Clone)]
pub struct ClickInteraction {
    shared: Rc<Shared>,
}

impl ClickInteraction {
    /// A click recognizer with the default tolerances.
    pub fn new() -> Self {
        Self::with_config(ClickConfig::default())
    }

    /// A click recognizer with custom tolerances.
    pub fn with_config(config: ClickConfig) -> Self {
        Self {
            shared: Rc::new(Shared {
                config: Cell::new(config),
                press: Cell::new(None),
                last_click: Cell::new(None),
                click: CallbackSet::new(),
                double_click: CallbackSet::new(),
            }),
        }
    }

    /// The tolerances in use.
    pub fn config(&self) -> ClickConfig {
        self.shared.config.get()
    }

    /// Replace the tolerances.
    pub fn set_config(&self, config: ClickConfig) {
        self.shared.config.set(config);
    }

    /// Call `callback` with the release point of every click.
    pub fn on_click(&self, callback: impl Fn(Point) + 'static) -> ListenerId {
        self.shared.click.add(move |p: &Point| callback(*p))
    }

    /// Remove a click listener.
    pub fn off_click(&self, id: ListenerId) -> bool {
        self.shared.click.remove(id)
    }

    /// Call `callback` with the release point of the second click of every double click.
    pub fn on_double_click(&self, callback: impl Fn(Point) + 'static) -> ListenerId {
        self.shared.double_click.add(move |p: &Point| callback(*p))
    }

    /// Remove a double-click listener.
    pub fn off_double_click(&self, id: ListenerId) -> bool {
        self.shared.double_click.remove(id)
    }

    /// Whether a press is in progress.
    pub fn is_pressed(&self) -> bool {
        self.shared.press.get().is_some()
    }

    fn release(&self, local: Point, inside: bool, time: f64) {
        let Some(press) = self.shared.press.take() else {
            return;
        };
        let config = self.config();
        if !inside || press.distance_exceeded || press.position.distance(local) > config.slop {
            return;
        }
        let double = self.shared.last_click.get().is_some_and(|last| {
            time - last.time <= config.double_click_window
                && last.position.distance(local) <= config.slop
        });
        if double {
            self.shared.last_click.set(None);
            self.shared.double_click.call(&local);
        } else {
            self.shared.last_click.set(Some(LastClick {
                position: local,
                time,
            }));
            self.shared.click.call(&local);
        }
    }
}

impl Default for ClickInteraction {
    fn default() -> Self {
        Self::new()
    }
}

impl Interaction for ClickInteraction {
    fn handle(&mut self, event: &InputEvent, target: &Target<'_>) -> Outcome {
        match *event {
            InputEvent::PointerDown {
                position,
                button: PointerButton::Primary,
                ..
            } if target.contains(position) => {
                self.shared.press.set(Some(Press {
                    position: target.to_local(position),
                    distance_exceeded: false,
                }));
            }
            InputEvent::PointerMove { position, .. } => {
                if let Some(mut press) = self.shared.press.get() {
                    let slop = self.config().slop;
                    if press.position.distance(target.to_local(position)) > slop {
                        press.distance_exceeded = true;
                        self.shared.press.set(Some(press));
                    }
                }
            }
            InputEvent::PointerUp {
                position,
                button: PointerButton::Primary,
                time,
            } => self.release(target.to_local(position), target.contains(position), time),
            InputEvent::PointerCancel => self.shared.press.set(None),
            _ => {}
        }
        Outcome::Continue
    }

    fn reset(&mut self) {
        self.shared.press.set(None);
        self.shared.last_click.set(None);
    }
}

impl fmt::Debug for ClickInteraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClickInteraction")
            .field("config", &self.config())
            .field("pressed", &self.is_pressed())
            .field("click", &self.shared.click)
            .field("double_click", &self.shared.double_click)
            .finish_non_exhaustive()
    }
}
