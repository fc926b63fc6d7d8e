/// Button state for one fighter on one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FighterInput {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub light: bool,
    pub heavy: bool,
}

impl FighterInput {
    pub fn idle() -> Self {
        Self::default()
    }
}

/// Inputs sampled for a tick. `p2` is ignored unless both fighters are local.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controls {
    pub p1: FighterInput,
    pub p2: FighterInput,
}

impl Controls {
    pub fn new(p1: FighterInput, p2: FighterInput) -> Self {
        Self { p1, p2 }
    }

    /// Same input for whichever fighter the caller controls
    pub fn single(input: FighterInput) -> Self {
        Self {
            p1: input,
            p2: input,
        }
    }
}
