use log::{info, log_enabled};

use crate::{
    entity::{Tag, User},
    location::ViewMode,
    page::{Screen, SelectedPost},
    view::{highlight, render_spans, tag_chips},
};

pub fn display_screen(screen: &Screen) {
    if !log_enabled!(log::Level::Info) {
        return;
    }
    display_posts(screen);
    if let Some(selected) = &screen.selected {
        display_selected(selected, screen.search());
    }
    if let Some(user) = &screen.profile {
        display_user(user);
    }
}

pub fn display_posts(screen: &Screen) {
    if screen.loading {
        info!("Loading...");
        return;
    }

    let search = screen.search();
    let active_tag = screen.state.tag.as_deref();
    let rows: Vec<_> = screen
        .posts
        .iter()
        .map(|row| {
            let title = render_spans(&highlight(&row.post.title, search));
            let tags = tag_chips(&row.post, active_tag)
                .into_iter()
                .map(|chip| if chip.active { format!("#{}*", chip.slug) } else { format!("#{}", chip.slug) })
                .collect::<Vec<_>>()
                .join(" ");
            let author = row
                .author
                .as_ref()
                .map(|user| user.username.clone())
                .unwrap_or_else(|| "-".to_string());
            let reactions = format!("+{} -{}", row.post.reactions.likes, row.post.reactions.dislikes);
            (row.post.id.to_string(), title, tags, author, reactions)
        })
        .collect();

    let (mut id_width, mut author_width, mut reaction_width) = (4_usize, 8_usize, 9_usize);
    for (id, _, _, author, reactions) in rows.iter() {
        id_width = id.len().max(id_width);
        author_width = author.chars().count().max(author_width);
        reaction_width = reactions.len().max(reaction_width);
    }

    info!(
        "+-{:-<id_width$}-+-{:-<author_width$}-+-{:-<reaction_width$}-+-{}------- - -",
        " ID ", " Author ", " Likes ", " Title "
    );
    for (id, title, tags, author, reactions) in rows.iter() {
        info!(
            "| {:>id_width$} | {:author_width$} | {:reaction_width$} | {} {}",
            id, author, reactions, title, tags
        );
    }
    info!(
        "+-{}-+-{}-+-{}-+------------ - -",
        "-".repeat(id_width),
        "-".repeat(author_width),
        "-".repeat(reaction_width)
    );

    let pagination = &screen.pagination;
    let updated = screen
        .updated
        .map(|time| format!(" updated {}", time.format("%H:%M:%S")))
        .unwrap_or_default();
    info!(
        "{} {} / {} ({} posts, {} per page) {}{}",
        if pagination.has_prev() { "<" } else { " " },
        pagination.page(),
        pagination.pages(),
        pagination.total,
        pagination.limit,
        if pagination.has_next() { ">" } else { " " },
        updated,
    );
    info!("");
}

pub fn display_selected(selected: &SelectedPost, search: &str) {
    let Some(post) = &selected.post else {
        info!("Post {} is not available", selected.id);
        return;
    };

    match selected.mode {
        ViewMode::Edit => info!("= Editing post {} =", post.id),
        ViewMode::Detail => info!("= {} =", render_spans(&highlight(&post.title, search))),
    }
    if let Some(author) = &selected.author {
        info!("by {} ({})", author.username, author.full_name);
    }
    info!("{}", render_spans(&highlight(&post.body, search)));
    info!("");

    if let Some(page) = &selected.comments {
        info!("Comments ({})", page.total);
        for comment in page.comments.iter() {
            let pending = if comment.is_pending() { " (saving)" } else { "" };
            info!(
                " {:>5} {}: {} [+{}]{}",
                comment.id,
                comment.user.username,
                render_spans(&highlight(&comment.body, search)),
                comment.likes,
                pending
            );
        }
        info!("");
    }
}

pub fn display_tags(tags: &[Tag]) {
    info!("Tags ({})", tags.len());
    for tag in tags {
        info!(" + {}", tag.slug);
    }
    info!("");
}

pub fn display_user(user: &User) {
    info!("= User {} =", user.id);
    info!("Username: {}", user.username);
    info!("Name: {}", user.full_name);
    if let Some(image) = &user.image {
        info!("Image: {}", image);
    }
    info!("");
}
