//! A small blog: one resource controller, a home page, and a JSON feed.
//!
//! ```text
//! cargo run --example blog
//! curl -d 'title=Hello&body=First+post' localhost:3000/posts
//! curl localhost:3000/posts/1.json
//! curl localhost:3000/feed
//! ```
//!
//! Reads `pergola.toml` from the working directory when present.

use std::path::Path;
use std::sync::Arc;

use pergola::{
    Application, Controller, Form, Length, MemoryStore, Method, Optional, Request, Required,
    Response, Server, Settings, Store, TeraRenderer,
};
use tracing_subscriber::EnvFilter;

const LAYOUT: &str = r#"<!doctype html><title>{% block title %}blog{% endblock %}</title>{% block body %}{% endblock %}"#;

const TEMPLATES: &[(&str, &str)] = &[
    ("layout.html", LAYOUT),
    ("home/index.html", r#"{% extends "layout.html" %}{% block body %}<a href="/posts">posts</a>{% endblock %}"#),
    (
        "post/index.html",
        r#"{% extends "layout.html" %}{% block body %}<ul>{% for post in resources %}<li><a href="/posts/{{ post.id }}">{{ post.title }}</a></li>{% endfor %}</ul><a href="/posts/new">write</a>{% endblock %}"#,
    ),
    (
        "post/new.html",
        r#"{% extends "layout.html" %}{% block body %}<form method="post" action="/posts/new">
<input name="title" value="{{ inputs.title | default(value="") }}">{{ errors.title | default(value="") }}
<textarea name="body">{{ inputs.body | default(value="") }}</textarea>
<button>save</button></form>{% endblock %}"#,
    ),
    (
        "post/show.html",
        r#"{% extends "layout.html" %}{% block body %}<h1>{{ resource.title }}</h1><p>{{ resource.body }}</p>
<form method="post" action="/posts/{{ resource.id }}"><input type="hidden" name="_method" value="DELETE"><button>delete</button></form>{% endblock %}"#,
    ),
    (
        "post/edit.html",
        r#"{% extends "layout.html" %}{% block body %}<form method="post" action="/posts/{{ resource.id }}">
<input type="hidden" name="_method" value="PUT">
<input name="title" value="{{ resource.title }}"><textarea name="body">{{ resource.body }}</textarea>
<button>update</button></form>{% endblock %}"#,
    ),
];

#[tokio::main]
async fn main() -> Result<(), pergola::Error> {
    let settings = match Path::new("pergola.toml").exists() {
        true => Settings::load("pergola.toml")?,
        false => Settings::default(),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let posts = Controller::resource("Post")
        .form(
            Form::new()
                .field("title", vec![Required::new().boxed(), Length::new(Some(1), Some(80)).boxed()])
                .field("body", vec![Optional::new().boxed(), Length::new(None, Some(4000)).boxed()]),
        )
        .on_show(|ctx| {
            let post = ctx.resource().cloned();
            match ctx.format().to_owned().as_str() {
                "json" => ctx.render_json(&post)?,
                "xml" => ctx.render_xml(&post)?,
                _ => {}
            }
            Ok(())
        });

    let store = Arc::new(MemoryStore::new());
    let feed_store = Arc::clone(&store);
    let feed = Controller::ajax("Feed").on(Method::Get, move |ctx| {
        let posts = feed_store.fetch_all("post")?;
        ctx.render_json(&posts)?;
        Ok(())
    });

    let app = Application::builder(
            Arc::new(TeraRenderer::from_sources(TEMPLATES.iter().copied())?),
            store,
        )
        .controller(Controller::simple("Home").path("/"))
        .controller(posts)
        .controller(feed)
        .handler(Method::Get, "/healthz", |_req: Request| async { Response::text("ok") })
        .build()?;

    Server::from_settings(&settings).serve(app).await
}
