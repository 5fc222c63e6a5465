//! Server-side HTML. Pages are plain strings; every user-supplied value goes
//! through `escape`.

use std::collections::HashSet;
use std::fmt::Write;

use axum::response::Html;

use warbler_db::Database;
use warbler_db::models::UserRow;
use warbler_types::api::{Flash, FlashCategory};
use warbler_types::models::{Message, ProfileStats, User};

use crate::middleware::CurrentUser;

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// What the logged-in user needs to see per-item controls: whom they follow
/// and which messages they liked.
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    pub id: i64,
    pub following: HashSet<i64>,
    pub liked: HashSet<i64>,
}

impl Viewer {
    pub fn load(db: &Database, user_id: i64) -> warbler_db::Result<Self> {
        Ok(Self {
            id: user_id,
            following: db.following(user_id)?.into_iter().map(|u| u.id).collect(),
            liked: db.liked_message_ids(user_id)?,
        })
    }

    /// `load` for an optional user.
    pub fn load_for(db: &Database, user_id: Option<i64>) -> warbler_db::Result<Option<Self>> {
        user_id.map(|id| Self::load(db, id)).transpose()
    }
}

/// Page chrome: navbar and flashed notices.
pub struct Layout<'a> {
    current: Option<&'a UserRow>,
    flashes: &'a [Flash],
}

impl<'a> Layout<'a> {
    pub fn new(current: &'a CurrentUser, flashes: &'a [Flash]) -> Self {
        Self { current: current.get(), flashes }
    }

    pub fn page(&self, title: &str, body: &str) -> Html<String> {
        let mut html = String::new();
        let _ = write!(
            html,
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
             <title>{}</title>\n<link rel=\"stylesheet\" href=\"/static/stylesheets/style.css\">\n\
             </head>\n<body>\n",
            escape(title)
        );
        html.push_str(&self.navbar());
        html.push_str("<main class=\"container\">\n");
        for flash in self.flashes {
            let _ = writeln!(
                html,
                "<div class=\"alert alert-{}\">{}</div>",
                category_class(flash.category),
                escape(&flash.message)
            );
        }
        html.push_str(body);
        html.push_str("</main>\n</body>\n</html>\n");
        Html(html)
    }

    fn navbar(&self) -> String {
        let mut nav = String::from(
            "<nav class=\"navbar\">\n<a class=\"brand\" href=\"/\">Warbler</a>\n\
             <form class=\"search\" action=\"/users\" method=\"get\">\
             <input name=\"q\" placeholder=\"Search Warbler\"><button>Search</button></form>\n<ul>\n",
        );
        match self.current {
            Some(user) => {
                let user = user.clone().into_model();
                let _ = write!(
                    nav,
                    "<li><a href=\"/users/{}\"><img src=\"{}\" alt=\"{}\"></a></li>\n\
                     <li><a href=\"/messages/new\">New Message</a></li>\n\
                     <li><a href=\"/logout\">Log out</a></li>\n",
                    user.id,
                    escape(&user.image_url),
                    escape(&user.username),
                );
            }
            None => {
                nav.push_str(
                    "<li><a href=\"/signup\">Sign up</a></li>\n<li><a href=\"/login\">Log in</a></li>\n",
                );
            }
        }
        nav.push_str("</ul>\n</nav>\n");
        nav
    }
}

fn category_class(category: FlashCategory) -> &'static str {
    match category {
        FlashCategory::Success => "success",
        FlashCategory::Danger => "danger",
        FlashCategory::Info => "info",
    }
}

// -- Users --

pub fn user_cards(users: &[User], viewer: Option<&Viewer>) -> String {
    if users.is_empty() {
        return "<p class=\"empty\">Sorry, no users found.</p>\n".to_string();
    }

    let mut html = String::from("<ul class=\"user-cards\">\n");
    for user in users {
        let _ = write!(
            html,
            "<li class=\"card\">\n<a href=\"/users/{id}\"><img src=\"{img}\" alt=\"Image for {name}\">\
             <span>@{name}</span></a>\n",
            id = user.id,
            img = escape(&user.image_url),
            name = escape(&user.username),
        );
        if let Some(bio) = &user.bio {
            let _ = writeln!(html, "<p class=\"bio\">{}</p>", escape(bio));
        }
        html.push_str(&follow_button(user.id, viewer));
        html.push_str("</li>\n");
    }
    html.push_str("</ul>\n");
    html
}

fn follow_button(user_id: i64, viewer: Option<&Viewer>) -> String {
    match viewer {
        Some(v) if v.id != user_id => {
            if v.following.contains(&user_id) {
                format!(
                    "<form method=\"post\" action=\"/users/stop-following/{user_id}\">\
                     <button class=\"btn-primary\">Unfollow</button></form>\n"
                )
            } else {
                format!(
                    "<form method=\"post\" action=\"/users/follow/{user_id}\">\
                     <button class=\"btn-outline\">Follow</button></form>\n"
                )
            }
        }
        _ => String::new(),
    }
}

/// Profile header plus stats, wrapping `content` (messages, user cards, likes).
pub fn profile(user: &User, stats: &ProfileStats, viewer: Option<&Viewer>, content: &str) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<section class=\"profile\">\n<div class=\"hero\" style=\"background-image: url('{header}')\"></div>\n\
         <img class=\"avatar\" src=\"{img}\" alt=\"Image for {name}\">\n<h4>@{name}</h4>\n",
        header = escape(&user.header_image_url),
        img = escape(&user.image_url),
        name = escape(&user.username),
    );
    if let Some(bio) = &user.bio {
        let _ = writeln!(html, "<p class=\"bio\">{}</p>", escape(bio));
    }
    if let Some(location) = &user.location {
        let _ = writeln!(html, "<p class=\"location\">{}</p>", escape(location));
    }
    let _ = write!(
        html,
        "<ul class=\"stats\">\n\
         <li><a href=\"/users/{id}\">Messages <b>{}</b></a></li>\n\
         <li><a href=\"/users/{id}/following\">Following <b>{}</b></a></li>\n\
         <li><a href=\"/users/{id}/followers\">Followers <b>{}</b></a></li>\n\
         <li><a href=\"/users/{id}/likes\">Likes <b>{}</b></a></li>\n</ul>\n",
        stats.messages,
        stats.following,
        stats.followers,
        stats.likes,
        id = user.id,
    );

    match viewer {
        Some(v) if v.id == user.id => {
            html.push_str(
                "<a class=\"btn-outline\" href=\"/users/profile\">Edit Profile</a>\n\
                 <form method=\"post\" action=\"/users/delete\">\
                 <button class=\"btn-danger\">Delete Profile</button></form>\n",
            );
        }
        _ => html.push_str(&follow_button(user.id, viewer)),
    }

    html.push_str("</section>\n");
    html.push_str(content);
    html
}

// -- Messages --

pub fn message_list(messages: &[Message], viewer: Option<&Viewer>) -> String {
    if messages.is_empty() {
        return "<p class=\"empty\">No messages yet.</p>\n".to_string();
    }

    let mut html = String::from("<ul class=\"messages\">\n");
    for message in messages {
        html.push_str("<li class=\"message\">\n");
        html.push_str(&message_body(message));
        html.push_str(&like_button(message, viewer));
        html.push_str("</li>\n");
    }
    html.push_str("</ul>\n");
    html
}

fn message_body(message: &Message) -> String {
    format!(
        "<a href=\"/users/{uid}\"><img src=\"{img}\" alt=\"\"> @{author}</a>\n\
         <span class=\"timestamp\">{ts}</span>\n\
         <p><a href=\"/messages/{id}\">{text}</a></p>\n",
        uid = message.user_id,
        img = escape(&message.author_image_url),
        author = escape(&message.author_username),
        ts = message.timestamp.format("%d %B %Y"),
        id = message.id,
        text = escape(&message.text),
    )
}

fn like_button(message: &Message, viewer: Option<&Viewer>) -> String {
    match viewer {
        Some(v) if v.id != message.user_id => {
            let (class, label) = if v.liked.contains(&message.id) {
                ("btn-primary", "Unlike")
            } else {
                ("btn-secondary", "Like")
            };
            format!(
                "<form method=\"post\" action=\"/users/add_like/{}\">\
                 <button class=\"{class}\">{label}</button></form>\n",
                message.id
            )
        }
        _ => String::new(),
    }
}

pub fn message_detail(message: &Message, viewer: Option<&Viewer>) -> String {
    let mut html = String::from("<article class=\"message-detail\">\n");
    html.push_str(&message_body(message));
    match viewer {
        Some(v) if v.id == message.user_id => {
            let _ = writeln!(
                html,
                "<form method=\"post\" action=\"/messages/{}/delete\">\
                 <button class=\"btn-danger\">Delete</button></form>",
                message.id
            );
        }
        _ => html.push_str(&like_button(message, viewer)),
    }
    html.push_str("</article>\n");
    html
}

pub fn anon_home() -> String {
    "<section class=\"home-hero\">\n<h1>What's Happening?</h1>\n<h4>New to Warbler?</h4>\n\
     <a class=\"btn-primary\" href=\"/signup\">Sign up now</a>\n</section>\n"
        .to_string()
}

pub fn home(user: &User, stats: &ProfileStats, timeline: &[Message], viewer: &Viewer) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<aside class=\"home-profile\">\n<a href=\"/users/{id}\"><img src=\"{img}\" alt=\"\"></a>\n\
         <p>@{name}</p>\n<ul class=\"stats\">\n\
         <li><a href=\"/users/{id}\">Messages <b>{}</b></a></li>\n\
         <li><a href=\"/users/{id}/following\">Following <b>{}</b></a></li>\n\
         <li><a href=\"/users/{id}/followers\">Followers <b>{}</b></a></li>\n</ul>\n</aside>\n",
        stats.messages,
        stats.following,
        stats.followers,
        id = user.id,
        img = escape(&user.image_url),
        name = escape(&user.username),
    );
    html.push_str(&message_list(timeline, Some(viewer)));
    html
}

// -- Forms --

fn error_list(errors: &[&str]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let mut html = String::from("<ul class=\"form-errors\">\n");
    for e in errors {
        let _ = writeln!(html, "<li>{}</li>", escape(e));
    }
    html.push_str("</ul>\n");
    html
}

fn text_input(name: &str, kind: &str, placeholder: &str, value: &str) -> String {
    format!(
        "<input type=\"{kind}\" name=\"{name}\" placeholder=\"{placeholder}\" value=\"{}\">\n",
        escape(value)
    )
}

pub fn signup_form(errors: &[&str], username: &str, email: &str, image_url: &str) -> String {
    let mut html = String::from("<h2>Join Warbler today.</h2>\n");
    html.push_str(&error_list(errors));
    html.push_str("<form method=\"post\" action=\"/signup\">\n");
    html.push_str(&text_input("username", "text", "Username", username));
    html.push_str(&text_input("email", "email", "E-mail", email));
    html.push_str(&text_input("password", "password", "Password", ""));
    html.push_str(&text_input("image_url", "text", "(Optional) Image URL", image_url));
    html.push_str("<button class=\"btn-primary\">Sign me up!</button>\n</form>\n");
    html
}

pub fn login_form(errors: &[&str], username: &str) -> String {
    let mut html = String::from("<h2>Welcome back.</h2>\n");
    html.push_str(&error_list(errors));
    html.push_str("<form method=\"post\" action=\"/login\">\n");
    html.push_str(&text_input("username", "text", "Username", username));
    html.push_str(&text_input("password", "password", "Password", ""));
    html.push_str("<button class=\"btn-primary\">Log in</button>\n</form>\n");
    html
}

pub fn profile_form(errors: &[&str], user: &UserRow) -> String {
    let opt = |v: &Option<String>| v.clone().unwrap_or_default();

    let mut html = String::from("<h2>Edit Your Profile.</h2>\n");
    html.push_str(&error_list(errors));
    html.push_str("<form method=\"post\" action=\"/users/profile\">\n");
    html.push_str(&text_input("username", "text", "Username", &user.username));
    html.push_str(&text_input("email", "email", "E-mail", &user.email));
    html.push_str(&text_input("image_url", "text", "(Optional) Image URL", &opt(&user.image_url)));
    html.push_str(&text_input(
        "header_image_url",
        "text",
        "(Optional) Header Image URL",
        &opt(&user.header_image_url),
    ));
    html.push_str(&text_input("bio", "text", "(Optional) Bio", &opt(&user.bio)));
    html.push_str(&text_input("location", "text", "(Optional) Location", &opt(&user.location)));
    html.push_str("<p>To confirm changes, enter your password:</p>\n");
    html.push_str(&text_input("password", "password", "Password", ""));
    let _ = write!(
        html,
        "<button class=\"btn-success\">Edit this user!</button>\n\
         <a class=\"btn-outline\" href=\"/users/{}\">Cancel</a>\n</form>\n",
        user.id
    );
    html
}

pub fn message_form(errors: &[&str], text: &str) -> String {
    let mut html = String::from("<h2>Add a message</h2>\n");
    html.push_str(&error_list(errors));
    let _ = write!(
        html,
        "<form method=\"post\" action=\"/messages/new\">\n\
         <textarea name=\"text\" placeholder=\"What's happening?\" maxlength=\"140\">{}</textarea>\n\
         <button class=\"btn-success\">Add my message!</button>\n</form>\n",
        escape(text)
    );
    html
}

/// Standalone error document, used where no request context is available.
pub fn error_page(code: &str, message: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{code}</title>\n</head>\n\
         <body>\n<main class=\"container\">\n<h1>{code}</h1>\n<p>{}</p>\n<a href=\"/\">Go home</a>\n</main>\n</body>\n</html>\n",
        escape(message)
    )
}
