use crate::{ArticleRecord, BuiltIndex, Corpus, Recommender, SimilarityMatrix, TfidfVectorizer};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_articles: usize,
    pub vocabulary_size: usize,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn articles(&self) -> PathBuf { self.root.join("articles.bin") }
    fn vectorizer(&self) -> PathBuf { self.root.join("vectorizer.bin") }
    fn similarity(&self) -> PathBuf { self.root.join("similarity.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.root.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| "index".into());
        name.push(suffix);
        self.root.with_file_name(name)
    }
}

fn write_bin<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let bytes = bincode::serialize(value)?;
    f.write_all(&bytes)?;
    Ok(())
}

fn read_bin<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let mut f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    Ok(bincode::deserialize(&buf)?)
}

pub fn save_articles(paths: &IndexPaths, articles: &[ArticleRecord]) -> Result<()> {
    write_bin(&paths.articles(), &articles)
}

pub fn load_articles(paths: &IndexPaths) -> Result<Vec<ArticleRecord>> {
    read_bin(&paths.articles())
}

pub fn save_vectorizer(paths: &IndexPaths, vectorizer: &TfidfVectorizer) -> Result<()> {
    write_bin(&paths.vectorizer(), vectorizer)
}

pub fn load_vectorizer(paths: &IndexPaths) -> Result<TfidfVectorizer> {
    read_bin(&paths.vectorizer())
}

pub fn save_similarity(paths: &IndexPaths, matrix: &SimilarityMatrix) -> Result<()> {
    write_bin(&paths.similarity(), matrix)
}

pub fn load_similarity(paths: &IndexPaths) -> Result<SimilarityMatrix> {
    read_bin(&paths.similarity())
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Write every artifact into a staging directory next to `paths.root`, then swap it into place.
/// If anything fails before the swap, the existing index is left untouched.
pub fn save_index(paths: &IndexPaths, built: &BuiltIndex, created_at: String) -> Result<()> {
    let staging = IndexPaths::new(paths.sibling(".staging"));
    if staging.root.exists() {
        fs::remove_dir_all(&staging.root)?;
    }
    create_dir_all(&staging.root)?;

    save_articles(&staging, built.corpus.records())?;
    save_vectorizer(&staging, &built.vectorizer)?;
    save_similarity(&staging, &built.similarity)?;
    let meta = MetaFile {
        num_articles: built.corpus.len(),
        vocabulary_size: built.vectorizer.vocabulary_size(),
        created_at,
        version: FORMAT_VERSION,
    };
    save_meta(&staging, &meta)?;

    swap_into_place(&staging.root, &paths.root, &paths.sibling(".previous"))?;
    tracing::info!(root = %paths.root.display(), num_articles = meta.num_articles, "index saved");
    Ok(())
}

/// Replace `root` with `staging`. The old `root` is parked at `previous` and restored if the
/// final rename fails.
fn swap_into_place(staging: &Path, root: &Path, previous: &Path) -> Result<()> {
    if previous.exists() {
        fs::remove_dir_all(previous)?;
    }
    let had_root = root.exists();
    if had_root {
        fs::rename(root, previous)?;
    }
    if let Err(err) = fs::rename(staging, root) {
        if had_root {
            if let Err(restore) = fs::rename(previous, root) {
                tracing::error!(error = %restore, previous = %previous.display(), "could not restore previous index");
            }
        }
        return Err(anyhow::Error::new(err).context(format!("moving {} into place", staging.display())));
    }
    if had_root {
        fs::remove_dir_all(previous)?;
    }
    Ok(())
}

/// Load the artifacts needed for serving. The vectorizer is not required for pairwise lookup.
pub fn load_recommender(paths: &IndexPaths) -> Result<Recommender> {
    let meta = load_meta(paths)?;
    anyhow::ensure!(
        meta.version == FORMAT_VERSION,
        "unsupported index version {} (expected {FORMAT_VERSION})",
        meta.version
    );
    let corpus = Corpus::from_records(load_articles(paths)?)?;
    let similarity = load_similarity(paths)?;
    let recommender = Recommender::new(corpus, similarity)?;
    tracing::info!(root = %paths.root.display(), num_articles = meta.num_articles, created_at = %meta.created_at, "index loaded");
    Ok(recommender)
}
