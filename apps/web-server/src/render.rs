//! Tera page rendering.
//!
//! Templates are compiled into the binary, so rendering does not depend on
//! the working directory.

use tera::{Context, Tera};

use yatube_shared::Viewer;

use crate::middleware::error::AppResult;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("includes/paginator.html", include_str!("../templates/includes/paginator.html")),
    ("includes/post_card.html", include_str!("../templates/includes/post_card.html")),
    ("includes/form_errors.html", include_str!("../templates/includes/form_errors.html")),
    ("posts/index.html", include_str!("../templates/posts/index.html")),
    ("posts/index_content.html", include_str!("../templates/posts/index_content.html")),
    ("posts/group_list.html", include_str!("../templates/posts/group_list.html")),
    ("posts/profile.html", include_str!("../templates/posts/profile.html")),
    ("posts/post_detail.html", include_str!("../templates/posts/post_detail.html")),
    ("posts/create_post.html", include_str!("../templates/posts/create_post.html")),
    ("posts/follow.html", include_str!("../templates/posts/follow.html")),
    ("auth/login.html", include_str!("../templates/auth/login.html")),
    ("auth/signup.html", include_str!("../templates/auth/signup.html")),
];

pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.iter().copied())?;
        tera.autoescape_on(vec![".html"]);
        Ok(Self { tera })
    }

    /// Render a full page; `viewer` drives the navigation bar.
    pub fn page(&self, template: &str, viewer: Option<&Viewer>, context: Context) -> AppResult<String> {
        let mut complete_context = Context::new();
        complete_context.insert("viewer", &viewer);
        complete_context.extend(context);

        Ok(self.tera.render(template, &complete_context)?)
    }

    /// Render a template fragment with exactly the given context.
    pub fn fragment(&self, template: &str, context: &Context) -> AppResult<String> {
        Ok(self.tera.render(template, context)?)
    }
}
