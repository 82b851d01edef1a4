use std::time::{Duration, Instant};

use ratatui::style::Color;

use crate::theme::theme;

const VISIBLE_FOR: Duration = Duration::from_millis(4000);
const FADE_FOR: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToastKind {
    Success,
    Error,
    #[default]
    Info,
}

impl ToastKind {
    pub fn icon(self) -> &'static str {
        match self {
            ToastKind::Success => "✓",
            ToastKind::Error => "✗",
            ToastKind::Info => "ℹ",
        }
    }

    pub fn color(self) -> Color {
        match self {
            ToastKind::Success => theme().toast_success,
            ToastKind::Error => theme().toast_error,
            ToastKind::Info => theme().toast_info,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastPhase {
    Visible,
    Fading,
    Expired,
}

/// A transient notification. The deadline lives in the value itself and is
/// inspected against the clock on each tick, so there is no detached timer
/// to cancel when the toast is replaced or the app shuts down.
#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    shown_at: Instant,
}

impl Toast {
    pub fn new(message: impl Into<String>, kind: ToastKind) -> Self {
        Self {
            message: message.into(),
            kind,
            shown_at: Instant::now(),
        }
    }

    pub fn phase(&self, now: Instant) -> ToastPhase {
        let age = now.saturating_duration_since(self.shown_at);
        if age < VISIBLE_FOR {
            ToastPhase::Visible
        } else if age < VISIBLE_FOR + FADE_FOR {
            ToastPhase::Fading
        } else {
            ToastPhase::Expired
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toast_phases_follow_deadlines() {
        let toast = Toast::new("saved", ToastKind::Success);
        let t0 = toast.shown_at;

        assert_eq!(toast.phase(t0), ToastPhase::Visible);
        assert_eq!(
            toast.phase(t0 + Duration::from_millis(3999)),
            ToastPhase::Visible
        );
        assert_eq!(
            toast.phase(t0 + Duration::from_millis(4100)),
            ToastPhase::Fading
        );
        assert_eq!(
            toast.phase(t0 + Duration::from_millis(4301)),
            ToastPhase::Expired
        );
    }

    #[test]
    fn kind_defaults_to_info() {
        assert_eq!(ToastKind::default(), ToastKind::Info);
    }

    #[test]
    fn icons_match_kind() {
        assert_eq!(ToastKind::Success.icon(), "✓");
        assert_eq!(ToastKind::Error.icon(), "✗");
        assert_eq!(ToastKind::Info.icon(), "ℹ");
    }
}
