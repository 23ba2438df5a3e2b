use std::error::Error;

use log::info;
use posts_manager::{
    config::{Command, Config},
    display::{display_screen, display_tags},
    location::ViewMode,
    Backend, Location, PostsManager, RestClient,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::parse();
    config.init_logger();
    info!("# Posts Manager #");
    info!("");

    let client = RestClient::new(&config)?;
    info!("Backend: {}", client.base());
    let location = Location::parse(config.location());
    let mut manager = PostsManager::new(client, location, config.current_user());

    // Load the page first so pagination and the open post are known.
    let screen = manager.refresh().await;
    match config.command() {
        Command::List => {}
        Command::Tags => display_tags(&screen.tags),
        command => run(&mut manager, command).await?,
    }

    let screen = manager.refresh().await;
    info!("Location: {}", manager.location());
    info!("");
    display_screen(&screen);
    Ok(())
}

async fn run<B: Backend>(manager: &mut PostsManager<B>, command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::List | Command::Tags => {}
        Command::Search { text } => manager.search(&text),
        Command::Tag { tag } => manager.select_tag(&tag),
        Command::Sort { by, order } => {
            if let Some(by) = by {
                manager.sort_by(&by);
            }
            if let Some(order) = order {
                manager.sort_order(order);
            }
        }
        Command::PageSize { limit } => manager.set_page_size(limit),
        Command::Next => {
            if !manager.next_page() {
                info!("Already on the last page");
            }
        }
        Command::Prev => {
            if !manager.prev_page() {
                info!("Already on the first page");
            }
        }
        Command::Show { id } => manager.open_post(id, ViewMode::Detail),
        Command::Edit { id, title, body } => {
            manager.open_post(id, ViewMode::Edit);
            manager.refresh().await;
            if !manager.edit_post.is_open() {
                return Err(format!("Post {} could not be loaded", id).into());
            }
            let form = manager.edit_post.fields_mut();
            if let Some(title) = title {
                form.title = title;
            }
            if let Some(body) = body {
                form.body = body;
            }
            let post = manager.submit_edit_post().await?;
            info!("Saved post {}: {}", post.id, post.title);
        }
        Command::Add { title, body, user_id } => {
            manager.open_add_post();
            let form = manager.add_post.fields_mut();
            form.title = title;
            form.body = body;
            if let Some(user_id) = user_id {
                form.author_id = user_id;
            }
            let post = manager.submit_add_post().await?;
            info!("Created post {}", post.id);
        }
        Command::Delete { id } => manager.delete_post(id).await?,
        Command::Comment { post, body } => {
            manager.open_post(post, ViewMode::Detail);
            manager.open_add_comment()?;
            manager.add_comment.fields_mut().body = body;
            manager.submit_add_comment().await?;
        }
        Command::EditComment { post, id, body } => {
            manager.open_post(post, ViewMode::Detail);
            let screen = manager.refresh().await;
            let comment = screen
                .selected
                .and_then(|selected| selected.comments)
                .and_then(|page| page.get(id).cloned())
                .ok_or_else(|| format!("Comment {} not found on post {}", id, post))?;
            manager.open_edit_comment(&comment);
            manager.edit_comment.fields_mut().body = body;
            manager.submit_edit_comment().await?;
        }
        Command::DeleteComment { post, id } => {
            manager.open_post(post, ViewMode::Detail);
            manager.delete_comment(id).await?;
        }
        Command::Like { post, id } => {
            manager.open_post(post, ViewMode::Detail);
            manager.refresh().await;
            let likes = manager.like_comment(id).await?;
            info!("Comment {} has {} likes", id, likes);
        }
        Command::User { id } => manager.view_profile(id),
    }
    Ok(())
}
