//! Double-buffered playback
//!
//! A `Player` renders the upcoming frame into a back bitmap while the front
//! bitmap is on display, and keeps track of completed loops. Timing is left
//! to the caller: hold the front for the duration `decode_next` returns, then
//! call `swap`.
use std::mem;

use crate::bitmap::Bitmap;
use crate::error::DrawError;
use crate::sequence::{FrameSequence, FrameSequenceState};
use crate::traits::{HasParameters, Parameter};

/// Shortest frame duration honored. Shorter ones are replaced by `DEFAULT_DELAY_MS`.
pub const MIN_DELAY_MS: u64 = 20;
pub const DEFAULT_DELAY_MS: u64 = 100;

/// How many times the animation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopBehavior {
    /// Loop forever.
    Infinite,
    /// Use the loop count stored in the file.
    Default,
    /// Run the given number of times.
    Finite(u32),
}

impl Default for LoopBehavior {
    fn default() -> LoopBehavior {
        LoopBehavior::Default
    }
}

impl<'a> Parameter<Player<'a>> for LoopBehavior {
    fn set_param(self, this: &mut Player<'a>) {
        this.loop_behavior = self
    }
}

pub struct Player<'a> {
    sequence: &'a FrameSequence,
    state: FrameSequenceState<'a>,
    front: Bitmap,
    back: Bitmap,
    front_frame: Option<usize>,
    back_frame: Option<usize>,
    next_frame: usize,
    loop_behavior: LoopBehavior,
    current_loop: u32,
    finished: bool,
}

impl<'a> HasParameters for Player<'a> {}

impl<'a> Player<'a> {
    /// Creates a player with the first frame already on display.
    pub fn new(sequence: &'a FrameSequence) -> Player<'a> {
        let (width, height) = (sequence.width(), sequence.height());
        let mut player = Player {
            sequence,
            state: sequence.create_state(),
            front: Bitmap::new(width, height),
            back: Bitmap::new(width, height),
            front_frame: None,
            back_frame: None,
            next_frame: 0,
            loop_behavior: LoopBehavior::default(),
            current_loop: 0,
            finished: false,
        };
        let count = sequence.frame_count();
        if count > 0 {
            let stride = player.front.stride();
            match player.state.draw_frame(0, player.front.pixels_mut(), stride, None) {
                Ok(_) => {
                    player.front_frame = Some(0);
                    player.next_frame = 1 % count;
                }
                Err(err) => warn!("cannot render the first frame: {}", err),
            }
        }
        player
    }

    /// Renders the upcoming frame into the back bitmap.
    ///
    /// Returns how long the front bitmap should stay on display.
    pub fn decode_next(&mut self) -> Result<u64, DrawError> {
        let frame = self.next_frame;
        // the back bitmap still holds the frame shown before the front one
        let previous = self.back_frame.take().filter(|&shown| shown < frame);
        let stride = self.back.stride();
        let delay = self
            .state
            .draw_frame(frame, self.back.pixels_mut(), stride, previous)?;
        self.back_frame = Some(frame);
        trace!("decoded frame {}, holding the current one for {} ms", frame, delay);
        Ok(if delay < MIN_DELAY_MS { DEFAULT_DELAY_MS } else { delay })
    }

    /// Brings the decoded frame to the front.
    ///
    /// Returns false if no decoded frame was waiting.
    pub fn swap(&mut self) -> bool {
        let shown = match self.back_frame {
            Some(frame) => frame,
            None => return false,
        };
        mem::swap(&mut self.front, &mut self.back);
        mem::swap(&mut self.front_frame, &mut self.back_frame);

        let count = self.sequence.frame_count();
        if shown + 1 == count {
            self.current_loop += 1;
            let limit = match self.loop_behavior {
                LoopBehavior::Infinite => 0,
                LoopBehavior::Default => self.sequence.default_loop_count(),
                LoopBehavior::Finite(n) => n,
            };
            if limit != 0 && self.current_loop == limit {
                debug!("finished after {} loops", self.current_loop);
                self.finished = true;
            }
        }
        self.next_frame = (shown + 1) % count;
        true
    }

    /// The last frame of the last loop is on display.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Makes frame 0 the next one decoded and resets loop accounting.
    pub fn rewind(&mut self) {
        self.next_frame = 0;
        self.current_loop = 0;
        self.finished = false;
    }

    pub fn front(&self) -> &Bitmap {
        &self.front
    }

    /// Frame on display, if any.
    pub fn current_frame(&self) -> Option<usize> {
        self.front_frame
    }

    pub fn current_loop(&self) -> u32 {
        self.current_loop
    }
}
