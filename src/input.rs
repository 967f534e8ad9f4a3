//! Bounded input event queue.
//!
//! The window layer converts winit events into [`InputEvent`]s and pushes them
//! into an [`EventQueue`]; the frame loop drains the queue once per frame in
//! arrival order. When the queue is full, new events are dropped.

use std::collections::VecDeque;

use winit::{
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Keyboard { key: KeyCode, pressed: bool },
    /// Cursor position in physical pixels.
    MouseMove { x: f64, y: f64 },
    MouseButton { button: MouseButton, pressed: bool },
    /// Scroll amount in lines.
    MouseWheel { x: f32, y: f32 },
    Resize { width: u32, height: u32 },
}

impl InputEvent {
    /// The queued form of a window event, if it is one the engine tracks.
    pub fn from_window_event(event: &WindowEvent) -> Option<Self> {
        match event {
            WindowEvent::KeyboardInput { event, .. } => match event.physical_key {
                PhysicalKey::Code(key) if !event.repeat => Some(Self::Keyboard {
                    key,
                    pressed: event.state == ElementState::Pressed,
                }),
                _ => None,
            },
            WindowEvent::CursorMoved { position, .. } => Some(Self::MouseMove {
                x: position.x,
                y: position.y,
            }),
            WindowEvent::MouseInput { state, button, .. } => Some(Self::MouseButton {
                button: *button,
                pressed: state.is_pressed(),
            }),
            WindowEvent::MouseWheel { delta, .. } => Some(match delta {
                MouseScrollDelta::LineDelta(x, y) => Self::MouseWheel { x: *x, y: *y },
                // 20 pixels per line, roughly what desktop toolkits use
                MouseScrollDelta::PixelDelta(p) => Self::MouseWheel {
                    x: p.x as f32 / 20.0,
                    y: p.y as f32 / 20.0,
                },
            }),
            WindowEvent::Resized(size) => Some(Self::Resize {
                width: size.width,
                height: size.height,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventQueue {
    events: VecDeque<InputEvent>,
    capacity: usize,
    dropped: usize,
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Queue `event`; returns `false` and discards it when the queue is full.
    pub fn push(&mut self, event: InputEvent) -> bool {
        if self.events.len() >= self.capacity {
            self.dropped += 1;
            return false;
        }
        self.events.push_back(event);
        true
    }

    /// Remove and yield all queued events, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = InputEvent> + '_ {
        self.events.drain(..)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events discarded because the queue was full, since creation.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}
