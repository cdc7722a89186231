use crate::canvas::Canvas;
use crate::flowable::{BreakInside, Flowable};
use crate::types::{Pt, Rect};

pub enum AddResult {
    Placed,
    Split(Box<dyn Flowable>),
    Overflow(Box<dyn Flowable>),
}

/// A rectangular region on a page that flowables are stacked into top to
/// bottom.
pub struct Frame {
    rect: Rect,
    cursor_y: Pt,
}

impl Frame {
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            cursor_y: Pt::ZERO,
        }
    }

    pub fn remaining_height(&self) -> Pt {
        (self.rect.height - self.cursor_y).max(Pt::ZERO)
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn is_empty(&self) -> bool {
        self.cursor_y <= Pt::ZERO
    }

    fn place(&mut self, flowable: &dyn Flowable, height: Pt, width: Pt, canvas: &mut Canvas) {
        let y = self.rect.y + self.cursor_y;
        flowable.draw(
            canvas,
            self.rect.x,
            y,
            self.rect.width,
            self.remaining_height(),
        );
        canvas.record_flowable_bounds(Rect::new(self.rect.x, y, width, height));
        self.cursor_y += height;
    }

    pub fn add(&mut self, flowable: Box<dyn Flowable>, canvas: &mut Canvas) -> AddResult {
        let avail_width = self.rect.width;
        let avail_height = self.remaining_height();
        if avail_height <= Pt::ZERO {
            return AddResult::Overflow(flowable);
        }

        let pagination = flowable.pagination();
        let size = flowable.wrap(avail_width, avail_height);

        let keep = flowable.keep_space();
        if keep > Pt::ZERO
            && !self.is_empty()
            && size.height + keep > avail_height
            && size.height + keep <= self.rect.height
        {
            return AddResult::Overflow(flowable);
        }

        if pagination.break_inside == BreakInside::Avoid
            && size.height > avail_height
            && size.height <= self.rect.height
            && !self.is_empty()
        {
            return AddResult::Overflow(flowable);
        }

        if size.height <= avail_height {
            self.place(flowable.as_ref(), size.height, size.width, canvas);
            return AddResult::Placed;
        }

        if let Some((first, second)) = flowable.split(avail_width, avail_height) {
            let first_size = first.wrap(avail_width, avail_height);
            if first_size.height > Pt::ZERO && first_size.height <= avail_height {
                self.place(first.as_ref(), first_size.height, first_size.width, canvas);
                return AddResult::Split(second);
            }
        }

        // Taller than an empty frame and unsplittable: place it anyway so the
        // layout keeps moving. The excess is clipped by the page edge.
        if self.is_empty() {
            self.place(flowable.as_ref(), avail_height, avail_width, canvas);
            self.cursor_y = self.rect.height;
            return AddResult::Placed;
        }

        AddResult::Overflow(flowable)
    }
}
