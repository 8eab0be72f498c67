use crate::block::Block;
use crate::canvas::{Canvas, Document};
use crate::error::RenderError;
use crate::frame::{AddResult, Frame};
use crate::types::{Margins, Pt, Rect, Size};
use std::collections::VecDeque;

/// Flows an ordered story of blocks into same-sized pages, breaking to
/// a fresh page on overflow and re-queuing split remainders.
pub struct DocTemplate {
    page_size: Size,
    margins: Margins,
    story: Vec<Box<dyn Block>>,
}

impl DocTemplate {
    pub fn new(page_size: Size, margins: Margins) -> Self {
        Self {
            page_size,
            margins,
            story: Vec::new(),
        }
    }

    pub fn add_block(&mut self, block: Box<dyn Block>) {
        self.story.push(block);
    }

    fn content_rect(&self) -> Rect {
        Rect {
            x: self.margins.left,
            y: self.margins.top,
            width: self.page_size.width - self.margins.left - self.margins.right,
            height: self.page_size.height - self.margins.top - self.margins.bottom,
        }
    }

    pub fn build(self) -> Result<Document, RenderError> {
        let rect = self.content_rect();
        if rect.width <= Pt::ZERO || rect.height <= Pt::ZERO {
            return Err(RenderError::InvalidConfiguration(
                "margins leave no printable area".to_string(),
            ));
        }

        let mut canvas = Canvas::new(self.page_size);
        let mut frame = Frame::new(rect);
        let mut story: VecDeque<Box<dyn Block>> = self.story.into();

        while let Some(block) = story.pop_front() {
            let mut current = block;
            loop {
                match frame.add(current, &mut canvas) {
                    AddResult::Placed => break,
                    AddResult::Split(remaining) => {
                        canvas.show_page();
                        frame = Frame::new(rect);
                        current = remaining;
                    }
                    AddResult::Overflow(remaining) => {
                        if frame.is_empty() {
                            // The frame refused a block despite being empty;
                            // a new page cannot help.
                            return Err(RenderError::UnplaceableBlock(
                                remaining.debug_name().to_string(),
                            ));
                        }
                        canvas.show_page();
                        frame = Frame::new(rect);
                        current = remaining;
                    }
                }
            }
        }

        Ok(canvas.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Spacer;

    #[test]
    fn story_breaks_onto_new_pages() {
        let mut doc = DocTemplate::new(Size::from_mm(100.0, 100.0), Margins::all_mm(10.0));
        // Content height is 80 mm; three 50 mm spacers need three pages.
        for _ in 0..3 {
            doc.add_block(Box::new(Spacer::new(Pt::from_mm(50.0))));
        }
        let document = doc.build().expect("builds");
        assert_eq!(document.pages.len(), 3);
    }

    #[test]
    fn empty_story_yields_single_blank_page() {
        let doc = DocTemplate::new(Size::a4(), Margins::all_mm(10.0));
        let document = doc.build().expect("builds");
        assert_eq!(document.pages.len(), 1);
    }

    #[test]
    fn degenerate_margins_are_rejected() {
        let doc = DocTemplate::new(Size::from_mm(20.0, 20.0), Margins::all_mm(15.0));
        assert!(matches!(
            doc.build(),
            Err(RenderError::InvalidConfiguration(_))
        ));
    }
}
