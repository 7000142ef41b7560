use hypertext::prelude::*;

use crate::events::PresentationStatus;

pub struct StatusBadge {
    pub status: PresentationStatus,
}

impl Renderable for StatusBadge {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud! {
            span class=(self.status.badge_class()) {
                (self.status.label())
            }
        }
        .render_to(buffer);
    }
}
