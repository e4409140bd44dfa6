use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};

use tmu::announcements::AnnouncementBoard;
use tmu::api::{ApiClient, ApiError};
use tmu::compose::PostDraft;
use tmu::config::{server_description, ConfigManager, ProfileVisibility};
use tmu::elections::ElectionBoard;
use tmu::feed::{FeedItem, FeedList};
use tmu::format::{announcement_time, format_count, relative_time};
use tmu::logging::{init_logging, LogConfig};
use tmu::profile::ProfileEditor;
use tmu::session::{RegistrationForm, Session};
use tmu::sidebar::{CampusSidebar, REFRESH_INTERVAL};
use tmu::storage::FileCredentialStore;
use tmu::{ActionError, ValidationError};
use tmu_types::{
    AddCandidateRequest, Announcement, AnnouncementFilter, AnnouncementRequest, FeedTab, Interaction, Media, MediaKind,
    Post, Priority, Theme,
};

/// TMU Times - the campus feed from the terminal
#[derive(Parser)]
#[command(name = "tmu")]
#[command(about = "Command-line client for the TMU Times campus social feed")]
#[command(version)]
struct Cli {
    /// Server URL to connect to
    #[arg(long, short)]
    server: Option<String>,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with a registration number
    Login {
        reg_number: String,
        #[arg(long, env = "TMU_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        reg_number: String,
        #[arg(long, env = "TMU_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        confirm: String,
        #[arg(long, default_value = "")]
        department: String,
        #[arg(long)]
        role: Option<String>,
    },
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List posts from a feed tab
    Feed {
        /// forYou, following or campus
        #[arg(long)]
        tab: Option<String>,
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Publish a post
    Post {
        content: String,
        #[arg(long = "image")]
        images: Vec<String>,
        #[arg(long = "video")]
        videos: Vec<String>,
    },
    Like { post_id: String },
    Repost { post_id: String },
    Bookmark { post_id: String },
    /// Show the comments on a post
    Comments { post_id: String },
    /// Comment on a post
    Comment { post_id: String, text: String },
    /// Reply to a comment. Replies are not saved by the server.
    Reply {
        post_id: String,
        comment_id: String,
        text: String,
    },
    /// List active elections with standings
    Elections,
    /// Vote for a candidate
    Vote {
        election_id: String,
        candidate_id: String,
    },
    /// List announcements
    Announcements {
        /// all, high or normal
        #[arg(long, default_value = "all")]
        filter: String,
    },
    Acknowledge { announcement_id: String },
    /// Campus statistics, trending tags and suggestions
    Stats {
        /// Keep refreshing
        #[arg(long)]
        watch: bool,
    },
    /// Show a profile, or edit your own
    Profile {
        user_id: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        avatar: Option<String>,
    },
    Follow {
        user_id: String,
        /// Unfollow instead
        #[arg(long)]
        undo: bool,
    },
    /// Edit one of your posts
    EditPost { post_id: String, content: String },
    DeletePost { post_id: String },
    /// Change your password
    Password {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
        #[arg(long)]
        confirm: String,
    },
    /// Manage announcements and election candidates
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Local settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Publish an announcement
    Announce(AnnouncementArgs),
    /// Replace the text and settings of an announcement
    EditAnnouncement {
        id: String,
        #[command(flatten)]
        fields: AnnouncementArgs,
    },
    DeleteAnnouncement { id: String },
    /// Current vote counts of an election
    Results { election_id: String },
    AddCandidate {
        election_id: String,
        name: String,
        #[arg(long, default_value = "")]
        manifesto: String,
    },
    RemoveCandidate {
        election_id: String,
        candidate_id: String,
    },
}

#[derive(Args)]
struct AnnouncementArgs {
    title: String,
    content: String,
    /// high, normal or low
    #[arg(long, default_value = "normal")]
    priority: String,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    pinned: bool,
}

impl AnnouncementArgs {
    fn into_request(self) -> Result<AnnouncementRequest> {
        let priority = Priority::parse(&self.priority)
            .ok_or_else(|| anyhow!("Unknown priority '{}', expected high, normal or low", self.priority))?;
        Ok(AnnouncementRequest {
            title: self.title,
            content: self.content,
            priority,
            category: self.category,
            is_pinned: self.pinned,
        })
    }
}

#[derive(Subcommand)]
enum ConfigAction {
    Show,
    SetServer { url: String },
    ResetServer,
    Theme { theme: String },
    Tab { tab: String },
    /// Profile visibility: public, students or private
    Visibility { visibility: String },
}

// Load environment variables from .env file
// This allows TMU_SERVER_URL to be set without command-line args
fn load_env() {
    let _ = dotenv::dotenv();
}

fn friendly(err: ActionError) -> anyhow::Error {
    anyhow!(err.user_message())
}

fn api_failure(err: ApiError) -> anyhow::Error {
    friendly(err.into())
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    let cli = Cli::parse();
    let config = ConfigManager::new()?;

    let mut log_config = if cli.verbose { LogConfig::verbose() } else { LogConfig::default() };
    log_config.log_file = config.config_dir().join("tmu_debug.log");
    init_logging(&log_config)?;

    let command = match cli.command {
        Command::Config { action } => return run_config(&config, &action),
        command => command,
    };

    let server_url = config.determine_server_url(cli.server.clone())?;
    log::info!("Using server {} ({})", server_url, server_description(&server_url));

    let store = FileCredentialStore::new()?;
    let mut session = Session::new(ApiClient::new(server_url), Box::new(store));
    session.restore().await;

    run(&mut session, &config, command).await
}

async fn run(session: &mut Session<ApiClient>, config: &ConfigManager, command: Command) -> Result<()> {
    let default_tab = config.load_preferences()?.default_tab;
    match command {
        Command::Login { reg_number, password } => {
            let user = session.login(&reg_number, &password).await.map_err(friendly)?;
            println!("Signed in as {}", user.name);
        }
        Command::Register {
            name,
            email,
            reg_number,
            password,
            confirm,
            department,
            role,
        } => {
            let form = RegistrationForm {
                name,
                email,
                reg_number,
                password,
                confirm_password: confirm,
                department,
                role,
            };
            let user = session.register(&form).await.map_err(friendly)?;
            println!("Welcome, {}", user.name);
        }
        Command::Logout => {
            session.logout().await;
            println!("Signed out");
        }
        Command::Whoami => {
            let user = session.require_user().map_err(friendly)?;
            println!("{} ({})", user.name, user.handle.as_deref().unwrap_or("-"));
            if let Some(department) = &user.department {
                println!("{}", department);
            }
            println!(
                "{} followers  {} following",
                format_count(user.followers.into()),
                format_count(user.following.into())
            );
        }
        Command::Feed { tab, pages } => {
            let tab = parse_tab(tab.as_deref(), default_tab)?;
            show_feed(session.backend(), tab, pages).await?;
        }
        Command::Post { content, images, videos } => {
            session.require_user().map_err(friendly)?;
            let mut draft = PostDraft::new(content);
            for url in images {
                draft.attach(Media { kind: MediaKind::Image, url });
            }
            for url in videos {
                draft.attach(Media { kind: MediaKind::Video, url });
            }
            let mut feed = FeedList::new(default_tab);
            feed.create_post(session.backend(), &mut draft).await.map_err(friendly)?;
            println!("Posted");
        }
        Command::Like { post_id } => toggle(session, &post_id, Interaction::Like, default_tab).await?,
        Command::Repost { post_id } => toggle(session, &post_id, Interaction::Repost, default_tab).await?,
        Command::Bookmark { post_id } => toggle(session, &post_id, Interaction::Bookmark, default_tab).await?,
        Command::Comments { post_id } => {
            let api = session.backend();
            let mut feed = locate(api, &post_id, default_tab).await?;
            feed.open_comments(api, &post_id).await.map_err(friendly)?;
            print_thread(feed.item(&post_id).map_err(friendly)?);
        }
        Command::Comment { post_id, text } => {
            session.require_user().map_err(friendly)?;
            let api = session.backend();
            let mut feed = locate(api, &post_id, default_tab).await?;
            feed.submit_comment(api, &post_id, &text).await.map_err(friendly)?;
            print_thread(feed.item(&post_id).map_err(friendly)?);
        }
        Command::Reply { post_id, comment_id, text } => {
            session.require_user().map_err(friendly)?;
            let api = session.backend();
            let mut feed = locate(api, &post_id, default_tab).await?;
            feed.open_comments(api, &post_id).await.map_err(friendly)?;
            feed.submit_reply(&post_id, &comment_id, &text).map_err(friendly)?;
            print_thread(feed.item(&post_id).map_err(friendly)?);
            println!("(replies are shown locally and not saved)");
        }
        Command::Elections => {
            let mut board = ElectionBoard::new();
            board.load(session.backend()).await;
            print_elections(&board)?;
        }
        Command::Vote { election_id, candidate_id } => {
            session.require_user().map_err(friendly)?;
            let mut board = ElectionBoard::new();
            if !board.load(session.backend()).await {
                bail!(board.error().unwrap_or_default().to_string());
            }
            if board.has_voted(&election_id) {
                bail!("You have already voted in this election");
            }
            if !board.select_candidate(&election_id, &candidate_id).map_err(friendly)? {
                return Err(friendly(ValidationError::NoSelection.into()));
            }
            board.vote(session.backend(), &election_id).await.map_err(friendly)?;
            println!("Vote recorded");
            print_elections(&board)?;
        }
        Command::Announcements { filter } => {
            let filter = AnnouncementFilter::parse(&filter)
                .ok_or_else(|| anyhow!("Unknown filter '{}', expected all, high or normal", filter))?;
            let mut board = AnnouncementBoard::new();
            board.set_filter(session.backend(), filter).await;
            if let Some(error) = board.error() {
                bail!(error.to_string());
            }
            for a in board.sorted() {
                print_announcement(a);
            }
        }
        Command::Acknowledge { announcement_id } => {
            let mut board = AnnouncementBoard::new();
            if board.acknowledge(session.backend(), &announcement_id).await {
                println!("Acknowledged");
            } else {
                bail!("Could not acknowledge announcement");
            }
        }
        Command::Stats { watch } => {
            let mut sidebar = CampusSidebar::new();
            loop {
                sidebar.refresh(session.backend()).await;
                print_sidebar(&sidebar);
                if !watch {
                    break;
                }
                tokio::time::sleep(REFRESH_INTERVAL).await;
                println!();
            }
        }
        Command::Profile {
            user_id,
            name,
            bio,
            department,
            avatar,
        } => {
            let editing = name.is_some() || bio.is_some() || department.is_some() || avatar.is_some();
            let mut editor = ProfileEditor::new();
            let user_id = match user_id {
                Some(id) => id,
                None => session.require_user().map_err(friendly)?.id.clone(),
            };
            editor.load(session.backend(), &user_id).await.map_err(friendly)?;
            if editing {
                if session.user().map(|u| u.id.as_str()) != Some(user_id.as_str()) {
                    bail!("You can only edit your own profile");
                }
                if let Some(name) = name {
                    editor.form.name = name;
                }
                if let Some(bio) = bio {
                    editor.form.bio = bio;
                }
                if let Some(department) = department {
                    editor.form.department = department;
                }
                if let Some(avatar) = avatar {
                    editor.form.avatar = avatar;
                }
                editor.save(session.backend()).await.map_err(friendly)?;
                println!("Profile saved");
            }
            print_profile(&editor);
        }
        Command::Follow { user_id, undo } => {
            session.require_user().map_err(friendly)?;
            let mut editor = ProfileEditor::new();
            if undo {
                editor.unfollow(session.backend(), &user_id).await.map_err(friendly)?;
                println!("Unfollowed {}", user_id);
            } else {
                editor.follow(session.backend(), &user_id).await.map_err(friendly)?;
                println!("Following {}", user_id);
            }
        }
        Command::EditPost { post_id, content } => {
            let user_id = session.require_user().map_err(friendly)?.id.clone();
            let mut editor = ProfileEditor::new();
            editor.load(session.backend(), &user_id).await.map_err(friendly)?;
            editor.edit_post(session.backend(), &post_id, &content).await.map_err(friendly)?;
            println!("Post updated");
        }
        Command::DeletePost { post_id } => {
            let user_id = session.require_user().map_err(friendly)?.id.clone();
            let mut editor = ProfileEditor::new();
            editor.load(session.backend(), &user_id).await.map_err(friendly)?;
            editor.delete_post(session.backend(), &post_id).await.map_err(friendly)?;
            println!("Post deleted");
        }
        Command::Password { current, new, confirm } => {
            session.change_password(&current, &new, &confirm).await.map_err(friendly)?;
            println!("Password changed");
        }
        Command::Admin { action } => {
            session.require_user().map_err(friendly)?;
            run_admin(session.backend(), action).await?;
        }
        Command::Config { action } => run_config(config, &action)?,
    }
    Ok(())
}

async fn run_admin(api: &ApiClient, action: AdminAction) -> Result<()> {
    match action {
        AdminAction::Announce(fields) => {
            let created = api.create_announcement(&fields.into_request()?).await.map_err(api_failure)?;
            print_announcement(&created);
        }
        AdminAction::EditAnnouncement { id, fields } => {
            let updated = api
                .update_announcement(&id, &fields.into_request()?)
                .await
                .map_err(api_failure)?;
            print_announcement(&updated);
        }
        AdminAction::DeleteAnnouncement { id } => {
            api.delete_announcement(&id).await.map_err(api_failure)?;
            println!("Announcement deleted");
        }
        AdminAction::Results { election_id } => {
            let mut candidates = api.election_results(&election_id).await.map_err(api_failure)?;
            candidates.sort_by(|a, b| b.votes.cmp(&a.votes));
            for c in candidates {
                println!("{:>6}  {} ({})", c.votes, c.name, c.id);
            }
        }
        AdminAction::AddCandidate {
            election_id,
            name,
            manifesto,
        } => {
            let request = AddCandidateRequest { name, manifesto };
            let election = api.add_candidate(&election_id, &request).await.map_err(api_failure)?;
            println!("{} now has {} candidates", election.title, election.candidates.len());
        }
        AdminAction::RemoveCandidate {
            election_id,
            candidate_id,
        } => {
            api.remove_candidate(&election_id, &candidate_id).await.map_err(api_failure)?;
            println!("Candidate removed");
        }
    }
    Ok(())
}

fn run_config(config: &ConfigManager, action: &ConfigAction) -> Result<()> {
    let mut prefs = config.load_preferences()?;
    match action {
        ConfigAction::Show => {
            let url = config.determine_server_url(None)?;
            println!("Server:     {} ({})", url, server_description(&url));
            println!("Theme:      {}", prefs.theme.as_str());
            println!("Feed tab:   {}", prefs.default_tab.as_str());
            println!("Visibility: {:?}", prefs.privacy.profile_visibility);
            return Ok(());
        }
        ConfigAction::SetServer { url } => {
            config.save_server_url(url)?;
            println!("Server set to {}", url);
            return Ok(());
        }
        ConfigAction::ResetServer => {
            config.clear_server_url()?;
            println!("Server reset to default");
            return Ok(());
        }
        ConfigAction::Theme { theme } => {
            prefs.theme = Theme::parse(theme).ok_or_else(|| anyhow!("Unknown theme '{}', expected light or dark", theme))?;
        }
        ConfigAction::Tab { tab } => {
            prefs.default_tab = parse_tab(Some(tab), prefs.default_tab)?;
        }
        ConfigAction::Visibility { visibility } => {
            prefs.privacy.profile_visibility = ProfileVisibility::parse(visibility)
                .ok_or_else(|| anyhow!("Unknown visibility '{}'", visibility))?;
        }
    }
    config.save_preferences(&prefs)?;
    println!("Preferences saved");
    Ok(())
}

fn parse_tab(tab: Option<&str>, fallback: FeedTab) -> Result<FeedTab> {
    match tab {
        None => Ok(fallback),
        Some(s) => FeedTab::parse(s).ok_or_else(|| anyhow!("Unknown tab '{}', expected forYou, following or campus", s)),
    }
}

async fn show_feed(api: &ApiClient, tab: FeedTab, pages: u32) -> Result<()> {
    let mut feed = FeedList::new(tab);
    feed.refresh(api).await;
    for _ in 1..pages {
        if feed.error().is_some() || !feed.load_more(api).await {
            break;
        }
    }
    if let Some(error) = feed.error() {
        bail!(error.to_string());
    }
    if feed.is_empty() {
        println!("No posts yet");
        return Ok(());
    }

    let now = Utc::now();
    let ids: Vec<String> = feed.items().iter().map(|item| item.id().to_string()).collect();
    for id in &ids {
        // Printed posts are fully on screen
        feed.record_view(api, id, 1.0).await.map_err(friendly)?;
        print_post(feed.item(id).map_err(friendly)?.post(), now);
    }
    if feed.has_more() {
        println!("(more posts: --pages {})", feed.page() + 1);
    }
    Ok(())
}

/// Load pages of a tab until `post_id` is listed.
async fn locate(api: &ApiClient, post_id: &str, tab: FeedTab) -> Result<FeedList> {
    let mut feed = FeedList::new(tab);
    feed.refresh(api).await;
    while feed.item(post_id).is_err() && feed.error().is_none() && feed.load_more(api).await {}
    if let Some(error) = feed.error() {
        bail!(error.to_string());
    }
    feed.item(post_id).map_err(friendly)?;
    Ok(feed)
}

async fn toggle(session: &Session<ApiClient>, post_id: &str, kind: Interaction, tab: FeedTab) -> Result<()> {
    session.require_user().map_err(friendly)?;
    let api = session.backend();
    let mut feed = locate(api, post_id, tab).await?;
    feed.toggle(api, post_id, kind).await.map_err(friendly)?;
    print_post(feed.item(post_id).map_err(friendly)?.post(), Utc::now());
    Ok(())
}

fn mark(on: bool, label: &str) -> String {
    if on {
        format!("[{}]", label)
    } else {
        label.to_string()
    }
}

fn print_post(post: &Post, now: chrono::DateTime<Utc>) {
    let badge = if post.is_official() { " (official)" } else { "" };
    println!(
        "{} {}{} · {}",
        post.author.name,
        post.author.handle,
        badge,
        relative_time(post.created_at, now)
    );
    if !post.content.is_empty() {
        println!("  {}", post.content);
    }
    for media in &post.media {
        println!("  <{:?}> {}", media.kind, media.url);
    }
    let c = &post.counters;
    println!(
        "  {} {}  {} {}  {} comments  {} views  {}   id: {}",
        format_count(c.likes.into()),
        mark(post.viewer.is_liked, "likes"),
        format_count(c.reposts.into()),
        mark(post.viewer.is_reposted, "reposts"),
        format_count(c.comments.into()),
        format_count(c.views.into()),
        mark(post.viewer.is_bookmarked, "saved"),
        post.id
    );
    println!();
}

fn print_thread(item: &FeedItem) {
    let now = Utc::now();
    print_post(item.post(), now);
    let thread = item.thread();
    if thread.comments().is_empty() {
        println!("  No comments yet");
    }
    for comment in thread.comments() {
        println!(
            "  {} · {}  (id: {})",
            comment.author.name,
            relative_time(comment.created_at, now),
            comment.id
        );
        println!("    {}", comment.content);
        for reply in &comment.replies {
            println!("      ↳ {}: {}", reply.author.name, reply.content);
        }
    }
}

fn print_elections(board: &ElectionBoard) -> Result<()> {
    if let Some(error) = board.error() {
        bail!(error.to_string());
    }
    if board.elections().is_empty() {
        println!("No active elections");
    }
    for election in board.elections() {
        let voted = if board.has_voted(&election.id) { "  (voted)" } else { "" };
        println!("{}{}  id: {}", election.title, voted, election.id);
        if !election.description.is_empty() {
            println!("  {}", election.description);
        }
        if let Some(end) = election.end_date {
            println!("  Ends {}", end.format("%b %-d, %Y"));
        }
        for standing in board.standings(&election.id) {
            let chosen = if standing.chosen { "*" } else { " " };
            println!(
                "  {} {:>3}%  {} ({} votes)  id: {}",
                chosen,
                standing.percentage,
                standing.candidate.name,
                format_count(standing.candidate.votes.into()),
                standing.candidate.id
            );
        }
        println!();
    }
    Ok(())
}

fn print_announcement(a: &Announcement) {
    let pin = if a.is_pinned { "[pinned] " } else { "" };
    println!("{} {}{} - {}", a.icon, pin, a.title, a.sender);
    if let Some(at) = a.published_at {
        println!("  {}", announcement_time(at, Utc::now()));
    }
    println!("  {}", a.content);
    println!("  id: {}  views: {}", a.id, format_count(a.views.into()));
}

fn print_sidebar(sidebar: &CampusSidebar) {
    if let Some(stats) = sidebar.stats() {
        println!("Campus");
        println!("  {} students", format_count(stats.users_total));
        println!("  {} posts today", format_count(stats.posts_today));
        println!("  {} active elections", stats.active_elections);
    }
    if !sidebar.top_trending().is_empty() {
        println!("Trending");
        for tag in sidebar.top_trending() {
            println!("  {}  {} posts", tag.tag, format_count(tag.posts));
        }
    }
    if !sidebar.suggestions().is_empty() {
        println!("Who to follow");
        for user in sidebar.suggestions() {
            println!("  {} {}  id: {}", user.name, user.handle.as_deref().unwrap_or(""), user.id);
        }
    }
}

fn print_profile(editor: &ProfileEditor) {
    let Some(user) = editor.user() else {
        return;
    };
    let now = Utc::now();
    println!("{} {}", user.name, user.handle.as_deref().unwrap_or(""));
    if let Some(bio) = user.bio.as_deref().filter(|b| !b.is_empty()) {
        println!("  {}", bio);
    }
    if let Some(department) = &user.department {
        println!("  {}", department);
    }
    println!(
        "  {} followers  {} following",
        format_count(user.followers.into()),
        format_count(user.following.into())
    );
    println!();
    for post in editor.posts() {
        print_post(post, now);
    }
}
