mod api;
mod overlay;
mod session;

use std::io::{BufRead, Write};
use std::path::Path;

use gram_types::api::FeedPost;
use gram_types::media::MediaKind;

use crate::api::{ApiClient, ClientError};
use crate::session::Session;

/// Sentinel URL written by a long-gone backend version that persisted
/// posts before relaying media. Rendered as a placeholder, never fetched.
const DUMMY_URL: &str = "dummy_url";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let base_url =
        std::env::var("GRAM_API_URL").unwrap_or_else(|_| "http://127.0.0.1:8001".to_string());
    let client = ApiClient::new(base_url.clone());

    println!("gram client — backend {}", base_url);
    println!("type `help` for commands");

    let stdin = std::io::stdin();
    let mut session = Session::Anonymous;

    loop {
        prompt(&session);
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let args: Vec<&str> = line.split_whitespace().collect();

        session = match args.as_slice() {
            [] => session,
            ["quit"] | ["exit"] => break,
            ["help"] => {
                print_help();
                session
            }
            ["register", email, password] => {
                run_register(&client, session, email, password).await
            }
            ["login", email, password] => run_login(&client, session, email, password).await,
            ["logout"] => {
                println!("logged out");
                Session::Anonymous
            }
            ["whoami"] => {
                match session.user() {
                    Some(user) => println!("{} ({})", user.email, user.id),
                    None => println!("not logged in"),
                }
                session
            }
            ["feed"] => run_feed(&client, session).await,
            ["delete", post_id] => run_delete(&client, session, post_id).await,
            ["upload", path, caption @ ..] => {
                let caption = caption.join(" ");
                run_upload(&client, session, path, &caption).await
            }
            _ => {
                println!("unrecognized command; type `help`");
                session
            }
        };
    }

    Ok(())
}

fn prompt(session: &Session) {
    match session.user() {
        Some(user) => print!("{} > ", user.email),
        None => print!("> "),
    }
    let _ = std::io::stdout().flush();
}

fn print_help() {
    println!("  register <email> <password>");
    println!("  login <email> <password>");
    println!("  logout");
    println!("  whoami");
    println!("  upload <path> [caption...]");
    println!("  feed");
    println!("  delete <post-id>");
    println!("  quit");
}

async fn run_register(client: &ApiClient, session: Session, email: &str, password: &str) -> Session {
    match client.register(email, password).await {
        Ok(user) => println!("account created for {} — now log in", user.email),
        Err(e) => report(e),
    }
    session
}

async fn run_login(client: &ApiClient, session: Session, email: &str, password: &str) -> Session {
    let token = match client.login(email, password).await {
        Ok(resp) => resp.access_token,
        Err(e) => {
            report(e);
            return session;
        }
    };

    // Populate the session from /users/me so the prompt shows who we are.
    match client.me(&token).await {
        Ok(user) => {
            println!("welcome, {}", user.email);
            Session::Authenticated { token, user }
        }
        Err(e) => {
            report(e);
            session
        }
    }
}

async fn run_upload(client: &ApiClient, session: Session, path: &str, caption: &str) -> Session {
    let Some(token) = session.token() else {
        println!("log in first");
        return session;
    };

    match client.upload(token, Path::new(path), caption).await {
        Ok(post) => println!("posted {} ({})", post.file_name, post.file_type),
        Err(e) => report(e),
    }
    session
}

async fn run_feed(client: &ApiClient, session: Session) -> Session {
    let Some(token) = session.token() else {
        println!("log in first");
        return session;
    };

    match client.feed(token).await {
        Ok(feed) if feed.posts.is_empty() => {
            println!("no posts yet — be the first to share something")
        }
        Ok(feed) => {
            for post in &feed.posts {
                render_post(post);
            }
        }
        Err(e) => report(e),
    }
    session
}

async fn run_delete(client: &ApiClient, session: Session, post_id: &str) -> Session {
    let Some(token) = session.token() else {
        println!("log in first");
        return session;
    };

    match client.delete_post(token, post_id).await {
        Ok(resp) => println!("{}", resp.message),
        Err(e) => report(e),
    }
    session
}

fn render_post(post: &FeedPost) {
    println!("---");
    let date = post.created_at.format("%Y-%m-%d");
    let owner_mark = if post.is_owner { "  [yours — `delete` to remove]" } else { "" };
    println!("{} • {}{}", post.email, date, owner_mark);
    println!("  id: {}", post.id);

    if post.url.is_empty() || post.url == DUMMY_URL {
        println!("  (media unavailable for this post)");
        return;
    }

    let caption = post.caption.as_deref().unwrap_or("");
    match post.file_type {
        MediaKind::Image => {
            // caption is burned into the image via the CDN overlay
            println!("  image: {}", overlay::transformed_url(&post.url, caption));
        }
        MediaKind::Video => {
            println!("  video: {}", post.url);
            if !caption.is_empty() {
                println!("  {}", caption);
            }
        }
    }
}

fn report(e: ClientError) {
    match &e {
        ClientError::Http(inner) if inner.is_connect() => {
            println!("error: backend not reachable — is the gram server running?")
        }
        _ => println!("error: {}", e),
    }
}
