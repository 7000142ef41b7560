//! Templating code.
//!
//! This defines the [`Page`] item, which is used in most of the other parts of
//! this crate.

use hypertext::prelude::*;

use crate::{auth::User, events::Event, permission::Role};

pub struct Page<R: Renderable> {
    body: Option<R>,
    user: Option<User<true>>,
    role: Role,
    event: Option<Event>,
    title: Option<String>,
}

impl<R: Renderable> Page<R> {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn event(mut self, event: Event) -> Self {
        self.event = Some(event);
        self
    }

    pub fn body(mut self, body: R) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the logged-in user. Navigation links depend on the role, so
    /// callers which know it should also call [`Page::role`].
    pub fn user(mut self, user: User<true>) -> Self {
        if self.role == Role::Anonymous {
            self.role = Role::User;
        }
        self.user = Some(user);
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn user_opt(mut self, user: Option<User<true>>) -> Self {
        match user {
            Some(user) => self.user(user),
            None => {
                self.user = None;
                self
            }
        }
    }
}

impl<R: Renderable> Renderable for Page<R> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let title = match (&self.title, &self.event) {
            (Some(title), _) => format!("{title} | Tally"),
            (None, Some(event)) => format!("{} | Tally", event.title),
            (None, None) => "Tally".to_string(),
        };

        maud! {
            html lang="en" {
                head {
                    meta charset="utf-8";
                    title { (title) }
                    link
                        href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css"
                        rel="stylesheet"
                        crossorigin="anonymous";
                    script src="https://cdn.jsdelivr.net/npm/htmx.org@2.0.7/dist/htmx.min.js" integrity="sha384-ZBXiYtYQ6hJ2Y0ZNoYuI+Nq5MqWBr+chMrS/RkXpNzQCApHEhOt2aY8EJgqwHLkJ" crossorigin="anonymous" {
                    }
                    meta
                        name="viewport"
                        content="width=device-width, initial-scale=1";
                }
                body class="d-flex flex-column vh-100" {
                    nav class="navbar navbar-expand"
                        style="background-color: #1f4e5f;"
                        data-bs-theme="dark" {
                        div class="container-fluid" {
                            a class="navbar-brand text-white" href="/" {
                                "Tally"
                            }
                            ul class="navbar-nav me-auto" style="gap: 1rem;" {
                                @if self.user.is_some() {
                                    li class="nav-item" {
                                        a class="nav-link text-white" href="/events" {
                                            "Events"
                                        }
                                    }
                                }
                                @if self.role == Role::Admin {
                                    li class="nav-item" {
                                        a class="nav-link text-white" href="/presentations" {
                                            "Presentations"
                                        }
                                    }
                                    li class="nav-item" {
                                        a class="nav-link text-white" href="/users" {
                                            "Users"
                                        }
                                    }
                                }
                                @if self.role == Role::Reviewer {
                                    li class="nav-item" {
                                        a class="nav-link text-white" href="/reviews" {
                                            "My reviews"
                                        }
                                    }
                                }
                                @if let Some(event) = &self.event {
                                    li class="nav-item" {
                                        a class="nav-link text-white"
                                          href=(format!("/present/{}", event.id)) {
                                            "Live view: " (event.title)
                                        }
                                    }
                                }
                            }
                            ul class="navbar-nav" style="gap: 1rem;" {
                                @if let Some(user) = &self.user {
                                    li class="nav-item" {
                                        a class="nav-link text-white" href="/profile" {
                                            (user.name())
                                        }
                                    }
                                    li class="nav-item" {
                                        form method="post" action="/logout" class="d-inline" {
                                            button type="submit" class="btn btn-link nav-link text-white" {
                                                "Log out"
                                            }
                                        }
                                    }
                                } @else {
                                    li class="nav-item" {
                                        a class="nav-link text-white" href="/login" {
                                            "Login"
                                        }
                                    }
                                    li class="nav-item" {
                                        a class="nav-link text-white" href="/register" {
                                            "Register"
                                        }
                                    }
                                }
                            }
                        }
                    }
                    div class="container flex-grow-1 py-4" {
                        @if let Some(body) = &self.body {
                            (body)
                        }
                    }
                }
            }
        }.render_to(buffer)
    }
}

impl<R: Renderable> Default for Page<R> {
    fn default() -> Self {
        Self {
            body: Default::default(),
            user: Default::default(),
            role: Role::Anonymous,
            event: Default::default(),
            title: Default::default(),
        }
    }
}
