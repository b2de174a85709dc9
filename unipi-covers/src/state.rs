#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverState {
    Open,
    Opening,
    Closing,
    Closed,
    Stopped,
}

impl CoverState {
    pub fn as_str(self) -> &'static str {
        match self {
            CoverState::Open => "open",
            CoverState::Opening => "opening",
            CoverState::Closing => "closing",
            CoverState::Closed => "closed",
            CoverState::Stopped => "stopped",
        }
    }

    /// Final (non-moving) state derived from a resting position.
    pub fn from_position(position: f64) -> Self {
        if position <= 0.0 {
            CoverState::Closed
        } else if position >= 100.0 {
            CoverState::Open
        } else {
            CoverState::Stopped
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Idle,
    Open,
    Close,
}

/// Direction of the output currently energised. `Up` opens (raises
/// position/tilt toward 100); `Down` closes (lowers toward 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}
