// Keyboard console: terminal keys stand in for the game pad and knobs
//
// WASD = left stick, Z/X = spin, arrows = head, Enter = Start (mode),
// C = kill, 1/2/3 = knob buttons, U/J I/K O/L = knobs 0/1/2, Q = quit
//
// Terminals report presses but not releases, so held controls are released
// after INPUT_TIMEOUT without another press.

use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};

use super::input::{Knob, KnobIndicator, PadKey};
use crate::config::INPUT_TIMEOUT;

const STICK_MAX: i16 = 100;
const BUTTON_MAX: i16 = 255;
const KNOB_STEP: i16 = 5;
const KNOB_RANGE: i16 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Input(PadKey, i16, i16),
    Quit,
}

pub struct Keyboard {
    stick: (i16, i16),
    spin: Option<PadKey>, // Left / Right held
    head: Option<PadKey>, // Up / Down held
    knobs: [i16; 4],
    last_movement: Instant,
}

impl Keyboard {
    pub fn new() -> Self {
        Self {
            stick: (0, 0),
            spin: None,
            head: None,
            knobs: [0; 4],
            last_movement: Instant::now(),
        }
    }

    /// Drain pending terminal events without blocking
    pub fn poll(&mut self) -> io::Result<Vec<KeyAction>> {
        let mut actions = Vec::new();
        while event::poll(Duration::ZERO)? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                if kind == KeyEventKind::Press || kind == KeyEventKind::Repeat {
                    actions.extend(self.on_key(code, Instant::now()));
                }
            }
        }
        actions.extend(self.expire(Instant::now()));
        Ok(actions)
    }

    /// Translate one key press into control events
    pub fn on_key(&mut self, code: KeyCode, now: Instant) -> Vec<KeyAction> {
        let mut out = Vec::new();
        match code {
            KeyCode::Char('w') => self.move_stick(None, Some(STICK_MAX), now, &mut out),
            KeyCode::Char('s') => self.move_stick(None, Some(-STICK_MAX), now, &mut out),
            KeyCode::Char('a') => self.move_stick(Some(-STICK_MAX), None, now, &mut out),
            KeyCode::Char('d') => self.move_stick(Some(STICK_MAX), None, now, &mut out),

            KeyCode::Char('z') => Self::hold(&mut self.spin, PadKey::Left, &mut out),
            KeyCode::Char('x') => Self::hold(&mut self.spin, PadKey::Right, &mut out),
            KeyCode::Up => Self::hold(&mut self.head, PadKey::Up, &mut out),
            KeyCode::Down => Self::hold(&mut self.head, PadKey::Down, &mut out),

            KeyCode::Enter => Self::click(PadKey::Start, &mut out),
            KeyCode::Tab => Self::click(PadKey::Select, &mut out),
            KeyCode::Char('c') => Self::click(PadKey::Cross, &mut out),
            KeyCode::Char('1') => Self::click(PadKey::KnobButton(Knob::K0), &mut out),
            KeyCode::Char('2') => Self::click(PadKey::KnobButton(Knob::K1), &mut out),
            KeyCode::Char('3') => Self::click(PadKey::KnobButton(Knob::K2), &mut out),

            KeyCode::Char('u') => self.turn(Knob::K0, KNOB_STEP, &mut out),
            KeyCode::Char('j') => self.turn(Knob::K0, -KNOB_STEP, &mut out),
            KeyCode::Char('i') => self.turn(Knob::K1, KNOB_STEP, &mut out),
            KeyCode::Char('k') => self.turn(Knob::K1, -KNOB_STEP, &mut out),
            KeyCode::Char('o') => self.turn(Knob::K2, KNOB_STEP, &mut out),
            KeyCode::Char('l') => self.turn(Knob::K2, -KNOB_STEP, &mut out),

            KeyCode::Char('q') | KeyCode::Esc => out.push(KeyAction::Quit),
            _ => {}
        }
        if matches!(code, KeyCode::Char('z' | 'x') | KeyCode::Up | KeyCode::Down) {
            self.last_movement = now;
        }
        out
    }

    /// Release held controls once movement keys stop
    pub fn expire(&mut self, now: Instant) -> Vec<KeyAction> {
        let mut out = Vec::new();
        if now.duration_since(self.last_movement) <= INPUT_TIMEOUT {
            return out;
        }
        if self.stick != (0, 0) {
            self.stick = (0, 0);
            out.push(KeyAction::Input(PadKey::LeftStick, 0, 0));
        }
        for held in [self.spin.take(), self.head.take()].into_iter().flatten() {
            out.push(KeyAction::Input(held, 0, 0));
        }
        out
    }

    fn move_stick(&mut self, x: Option<i16>, y: Option<i16>, now: Instant, out: &mut Vec<KeyAction>) {
        // a fresh movement after the timeout starts from centre
        if now.duration_since(self.last_movement) > INPUT_TIMEOUT {
            self.stick = (0, 0);
        }
        self.last_movement = now;
        if let Some(x) = x {
            self.stick.0 = x;
        }
        if let Some(y) = y {
            self.stick.1 = y;
        }
        out.push(KeyAction::Input(PadKey::LeftStick, self.stick.0, self.stick.1));
    }

    fn hold(slot: &mut Option<PadKey>, key: PadKey, out: &mut Vec<KeyAction>) {
        if let Some(prev) = slot.replace(key) {
            if prev != key {
                out.push(KeyAction::Input(prev, 0, 0));
            }
        }
        out.push(KeyAction::Input(key, BUTTON_MAX, 0));
    }

    fn click(key: PadKey, out: &mut Vec<KeyAction>) {
        out.push(KeyAction::Input(key, BUTTON_MAX, 0));
        out.push(KeyAction::Input(key, 0, 0));
    }

    fn turn(&mut self, knob: Knob, step: i16, out: &mut Vec<KeyAction>) {
        let value = &mut self.knobs[knob as usize];
        *value = (*value + step).clamp(-KNOB_RANGE, KNOB_RANGE);
        out.push(KeyAction::Input(PadKey::Knob(knob), *value, 0));
    }

    pub fn knob(&self, knob: Knob) -> i16 {
        self.knobs[knob as usize]
    }
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new()
    }
}

impl KnobIndicator for Keyboard {
    fn set_knob(&mut self, knob: Knob, value: i16) {
        self.knobs[knob as usize] = value.clamp(-KNOB_RANGE, KNOB_RANGE);
    }
}
