use hypertext::prelude::*;

/// A row of buttons linking to other pages.
pub struct Actions<'r> {
    pub options: &'r [(&'r str, &'r str)],
}

impl<'r> Renderable for Actions<'r> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud! {
            div class="row mt-3 mb-3 g-2" {
                @for (link, text) in self.options {
                    div class="col-md-auto" {
                        a class="btn btn-outline-primary" href=(link) {
                            (text)
                        }
                    }
                }
            }
        }
        .render_to(buffer);
    }
}

/// A single-button form which posts to `action`, optionally asking for
/// confirmation first.
pub struct PostButton<'r> {
    pub action: &'r str,
    pub label: &'r str,
    pub class: &'r str,
    pub confirm: Option<&'r str>,
}

impl<'r> Renderable for PostButton<'r> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud! {
            form method="post" action=(self.action) class="d-inline" {
                @if let Some(confirm) = self.confirm {
                    button type="submit" class=(self.class)
                        onclick=(format!("return confirm('{confirm}')")) {
                        (self.label)
                    }
                } @else {
                    button type="submit" class=(self.class) {
                        (self.label)
                    }
                }
            }
        }
        .render_to(buffer);
    }
}
