//! Wiring and command handlers.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use faq_embeddings::{
    EmbeddingError, EmbeddingGateway, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse,
};
use faq_retrieval::{
    BrowseEngine, RetrievalEngine, SearchOutcome, SearchRequest, clean_chat_query, compose_reply,
    paginate,
};
use faq_store::{
    EntryDraft, EntryId, EntryStore, ImagePaths, PALETTE, StoreError, TagFilter, TagInfo,
};
use tracing::warn;

use crate::cli::{AddArgs, AskArgs, BrowseArgs, Command, FailedCommand, SearchArgs, TagsCommand};
use crate::config::FaqConfig;

/// Stands in for the real provider when no API key is set, so commands that
/// never embed still work and the rest degrade to "no results".
struct UnconfiguredProvider;

#[async_trait]
impl EmbeddingProvider for UnconfiguredProvider {
    fn name(&self) -> &str {
        "unconfigured"
    }

    fn default_model(&self) -> &str {
        ""
    }

    async fn embed(&self, _request: EmbeddingRequest) -> faq_embeddings::Result<EmbeddingResponse> {
        Err(EmbeddingError::ProviderNotConfigured)
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Opened store and engines.
pub struct App {
    config: FaqConfig,
    store: Arc<EntryStore>,
    engine: RetrievalEngine,
    browse: BrowseEngine,
}

impl App {
    pub async fn open(config: FaqConfig) -> Result<Self> {
        let gateway = match EmbeddingGateway::from_config(&config.embedding) {
            Ok(gateway) => gateway,
            Err(e) => {
                warn!(
                    "Embeddings disabled ({e}); set {} to enable search and writes",
                    config.embedding.api_key_env
                );
                EmbeddingGateway::new(Arc::new(UnconfiguredProvider))
            }
        };

        let store = Arc::new(
            EntryStore::open(&config.store, Arc::new(gateway))
                .await
                .with_context(|| format!("failed to open store in {}", config.store.data_dir.display()))?,
        );
        let engine = RetrievalEngine::new(store.clone(), &config.retrieval);
        let browse = BrowseEngine::new(store.clone());

        Ok(Self {
            config,
            store,
            engine,
            browse,
        })
    }

    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Search(args) => self.search(args).await,
            Command::Ask(args) => self.ask(args).await,
            Command::Browse(args) => self.browse(args).await,
            Command::Show { id } => self.show(&id).await,
            Command::Add(args) => self.add(args).await,
            Command::Delete { id } => self.delete(&id).await,
            Command::Tags { command } => self.tags(command).await,
            Command::Failed { command } => self.failed(command).await,
        }
    }

    async fn search(&self, args: SearchArgs) -> Result<()> {
        let limits = self.engine.limits();
        let tag = TagFilter::from(args.tag.as_deref());
        let paged = args.top.is_none() && !args.compact;
        let request = match args.top {
            Some(n) => SearchRequest::top(limits, &args.query, tag, n),
            None if args.compact => SearchRequest::compact(limits, &args.query, tag),
            None => SearchRequest::interactive(limits, &args.query, tag),
        };

        let hits = match self.engine.search(&request).await? {
            SearchOutcome::EmptyQuery => bail!("query is empty"),
            SearchOutcome::EmbeddingUnavailable => {
                println!("Search is unavailable right now, no results.");
                return Ok(());
            }
            SearchOutcome::NoCandidates | SearchOutcome::NoRelevantResult => {
                println!("No relevant answer found for \"{}\".", args.query.trim());
                return Ok(());
            }
            SearchOutcome::Found(hits) => hits,
        };

        let (hits, footer) = if paged {
            let page = paginate(&hits, args.page.saturating_sub(1), self.config.retrieval.page_size);
            let footer = format!(
                "Page {}/{} ({} results)",
                page.page_index + 1,
                page.total_pages,
                page.total_count
            );
            (page.items, Some(footer))
        } else {
            (hits, None)
        };

        for hit in &hits {
            let color = self.store.catalog().color_for(&hit.entry.tag).await;
            println!(
                "[{}%|{}] #{} {} ({} {color})",
                hit.display_score(),
                hit.band.as_str(),
                hit.entry.id,
                hit.entry.title,
                hit.entry.tag
            );
        }
        if let Some(footer) = footer {
            println!("{footer}");
        }
        Ok(())
    }

    async fn ask(&self, args: AskArgs) -> Result<()> {
        let query = clean_chat_query(&args.message);
        let answer = self.engine.best_answer(&query).await?;
        let reply = compose_reply(&answer, &args.name);

        println!("{}", reply.text);
        for image in &reply.images {
            println!("[image] {} - {}", image.path, image.caption);
        }
        Ok(())
    }

    async fn browse(&self, args: BrowseArgs) -> Result<()> {
        let filter = TagFilter::from(args.tag.as_deref());
        let page_size = args.page_size.unwrap_or(self.config.retrieval.page_size);
        let page = self.browse.browse(&filter, args.page.saturating_sub(1), page_size).await?;

        for entry in &page.items {
            println!("#{} [{}] {}", entry.id, entry.tag, entry.title);
        }
        println!(
            "Page {}/{} ({} entries, filter: {filter})",
            page.page_index + 1,
            page.total_pages.max(1),
            page.total_count
        );
        Ok(())
    }

    async fn show(&self, id: &str) -> Result<()> {
        let Some(record) = self.store.get_record(id).await? else {
            bail!("entry {id} not found");
        };
        let meta = &record.metadata;

        println!("#{} [{}] {}", record.id, meta.tag, meta.title);
        println!();
        println!("{}", meta.answer_text);
        if !meta.keywords.is_empty() {
            println!("\nKeywords: {}", meta.keywords);
        }
        println!("Images: {}", meta.image_paths);
        if let Some(url) = &meta.source_url {
            println!("Source: {url}");
        }
        println!("\n--- embedded text ---\n{}", record.document);
        Ok(())
    }

    async fn add(&self, args: AddArgs) -> Result<()> {
        let mut draft = EntryDraft::new(args.tag.trim(), args.title, args.answer)
            .with_keywords(args.keywords)
            .with_images(ImagePaths::parse(&args.images));
        if let Some(source) = args.source {
            draft = draft.with_source_url(source);
        }

        match self.store.upsert(EntryId::parse(&args.id), draft).await {
            Ok(id) => {
                println!("Saved entry #{id}");
                Ok(())
            }
            Err(StoreError::Busy { attempts }) => {
                bail!("database busy after {attempts} attempts, try again in a moment")
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        if self.store.get_by_id(id).await?.is_none() {
            println!("Entry #{id} does not exist, nothing to delete.");
            return Ok(());
        }
        self.store.delete(id).await?;
        println!("Deleted entry #{id}");
        Ok(())
    }

    async fn tags(&self, command: TagsCommand) -> Result<()> {
        let catalog = self.store.catalog();
        match command {
            TagsCommand::List => {
                for (name, info) in catalog.entries().await {
                    println!("{name:<12} {} {}", info.color, info.description);
                }
            }
            TagsCommand::Set {
                name,
                color,
                description,
            } => {
                let color = resolve_color(&color)?;
                catalog
                    .upsert(&name, TagInfo::new(color, description))
                    .await?;
                println!("Saved tag {name}; re-save its entries to refresh their embeddings");
            }
            TagsCommand::Remove { name } => {
                if catalog.remove(&name).await? {
                    println!("Removed tag {name}");
                } else {
                    println!("Tag {name} does not exist");
                }
            }
            TagsCommand::Palette => {
                for color in PALETTE {
                    println!("{:<8} {} {}", color.name, color.hex, color.label);
                }
            }
        }
        Ok(())
    }

    async fn failed(&self, command: FailedCommand) -> Result<()> {
        let log = self.engine.feedback();
        match command {
            FailedCommand::List => {
                let records = log.read_all().await?;
                if records.is_empty() {
                    println!("No failed searches logged.");
                }
                for record in records {
                    println!("{} {}", record.timestamp.format("%Y-%m-%d %H:%M:%S"), record.query);
                }
            }
            FailedCommand::Clear => {
                log.clear().await?;
                println!("Cleared failed-search log");
            }
        }
        Ok(())
    }
}

/// Accept a palette name or a `#rrggbb` hex colour.
pub fn resolve_color(input: &str) -> Result<String> {
    let input = input.trim();
    if let Some(color) = PALETTE.iter().find(|c| c.name.eq_ignore_ascii_case(input)) {
        return Ok(color.hex.to_string());
    }
    let is_hex = input
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()));
    if !is_hex {
        bail!("unknown colour {input:?}; use #rrggbb or one of the palette names");
    }
    Ok(input.to_uppercase())
}
