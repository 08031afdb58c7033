/// One step of a frame, in execution order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FrameStage {
    BindOffscreen,
    BuildQueue,
    DrawScene,
    Resolve,
    BindScreen,
    PostProcess,
    Present,
    ReleaseFrame,
}

impl FrameStage {
    pub const ORDER: [FrameStage; 8] = [
        FrameStage::BindOffscreen,
        FrameStage::BuildQueue,
        FrameStage::DrawScene,
        FrameStage::Resolve,
        FrameStage::BindScreen,
        FrameStage::PostProcess,
        FrameStage::Present,
        FrameStage::ReleaseFrame,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Stage that follows `self` within a frame; `None` after the last one.
    #[inline]
    pub fn next(self) -> Option<FrameStage> {
        Self::ORDER.get(self.index() + 1).copied()
    }
}

/// Tracks progress through [`FrameStage::ORDER`].
///
/// A new frame may begin at `BindOffscreen` from any point, which abandons an
/// unfinished frame. Every other stage must directly follow its predecessor.
#[derive(Debug, Default, Clone)]
pub struct StageTracker {
    last: Option<FrameStage>,
    completed_frames: u64,
}

impl StageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records entry into `stage`, rejecting out-of-order transitions.
    pub fn enter(&mut self, stage: FrameStage) -> Result<(), super::RenderError> {
        let expected = match self.last {
            None => FrameStage::BindOffscreen,
            Some(last) => last.next().unwrap_or(FrameStage::BindOffscreen),
        };

        if stage == expected || stage == FrameStage::BindOffscreen {
            if stage == FrameStage::BindOffscreen && expected != FrameStage::BindOffscreen {
                log::warn!("frame restarted after {:?}", self.last);
            }
            if stage == FrameStage::ReleaseFrame {
                self.completed_frames += 1;
            }
            self.last = Some(stage);
            Ok(())
        } else {
            Err(super::RenderError::StageOrder { expected, found: stage })
        }
    }

    /// Last stage entered, if any.
    #[inline]
    pub fn current(&self) -> Option<FrameStage> {
        self.last
    }

    #[inline]
    pub fn completed_frames(&self) -> u64 {
        self.completed_frames
    }

    /// True between `BindOffscreen` and `ReleaseFrame`.
    #[inline]
    pub fn in_frame(&self) -> bool {
        self.last.is_some_and(|s| s != FrameStage::ReleaseFrame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderError;

    #[test]
    fn order_matches_discriminants() {
        for (i, stage) in FrameStage::ORDER.iter().enumerate() {
            assert_eq!(stage.index(), i);
        }
        assert_eq!(FrameStage::ReleaseFrame.next(), None);
    }

    #[test]
    fn full_frame_in_order() {
        let mut t = StageTracker::new();
        for stage in FrameStage::ORDER {
            t.enter(stage).unwrap();
        }
        assert_eq!(t.completed_frames(), 1);
        assert!(!t.in_frame());
        // And the next frame starts cleanly.
        t.enter(FrameStage::BindOffscreen).unwrap();
        assert!(t.in_frame());
    }

    #[test]
    fn skipping_a_stage_is_rejected() {
        let mut t = StageTracker::new();
        t.enter(FrameStage::BindOffscreen).unwrap();
        let err = t.enter(FrameStage::DrawScene).unwrap_err();
        assert!(matches!(
            err,
            RenderError::StageOrder {
                expected: FrameStage::BuildQueue,
                found: FrameStage::DrawScene,
            }
        ));
        // A rejected stage leaves progress untouched.
        assert_eq!(t.current(), Some(FrameStage::BindOffscreen));
    }

    #[test]
    fn first_stage_must_be_bind_offscreen() {
        let mut t = StageTracker::new();
        assert!(t.enter(FrameStage::Present).is_err());
    }

    #[test]
    fn restart_abandons_partial_frame() {
        let mut t = StageTracker::new();
        t.enter(FrameStage::BindOffscreen).unwrap();
        t.enter(FrameStage::BuildQueue).unwrap();
        t.enter(FrameStage::BindOffscreen).unwrap();
        assert_eq!(t.completed_frames(), 0);
        assert_eq!(t.current(), Some(FrameStage::BindOffscreen));
    }
}
