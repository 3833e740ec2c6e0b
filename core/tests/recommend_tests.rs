use newsrec_core::persist::{load_recommender, load_vectorizer, save_index, IndexPaths};
use newsrec_core::{build_index, Error, RawArticle, Recommender, VectorizerConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use tempfile::tempdir;

fn article(i: usize, text: &str) -> RawArticle {
    RawArticle {
        date: Some(format!("2024-03-{:02}", i % 28 + 1)),
        title: Some(format!("Story {i}")),
        text: Some(text.to_string()),
        link: Some(format!("https://news.example/{i}")),
    }
}

fn river_corpus() -> Vec<RawArticle> {
    vec![
        article(0, "a river flows"),
        article(1, "a river flows fast"),
        article(2, "completely unrelated text"),
    ]
}

fn topical_corpus(n: usize) -> Vec<RawArticle> {
    let topics = [
        "central bank raises interest rates inflation",
        "football club wins league title match",
        "new smartphone launch battery camera",
        "election campaign voters parliament vote",
        "climate summit emissions carbon targets",
    ];
    (0..n).map(|i| article(i, &format!("{} report {}", topics[i % topics.len()], ["morning", "evening"][i % 2]))).collect()
}

fn recommender(rows: Vec<RawArticle>) -> Recommender {
    Recommender::from_built(build_index(rows, VectorizerConfig::default()).unwrap()).unwrap()
}

#[test]
fn similar_article_outranks_unrelated_one() {
    let rec = recommender(river_corpus());
    let results = rec.recommend(0, 2).unwrap();
    let ids: Vec<usize> = results.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(results[0].score, 1.0);
    assert_eq!(results[1].score, 0.0);
    assert_eq!(results[0].link, "https://news.example/1");
}

#[test]
fn unknown_article_is_not_found() {
    let rec = recommender(topical_corpus(50));
    assert!(matches!(rec.recommend(10_000_000, 5), Err(Error::NotFound { id: 10_000_000 })));
    assert!(matches!(rec.recommend(50, 5), Err(Error::NotFound { .. })));
}

#[test]
fn recommendations_exclude_self_and_are_sorted() {
    let rec = recommender(topical_corpus(50));
    for id in 0..50 {
        let results = rec.recommend(id, 49).unwrap();
        assert_eq!(results.len(), 49);
        assert!(results.iter().all(|r| r.id != id));
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        // same topic ranks first
        assert_eq!(results[0].id % 5, id % 5);
    }
}

#[test]
fn count_edge_cases() {
    let rec = recommender(topical_corpus(10));
    assert!(rec.recommend(3, 0).unwrap().is_empty());
    assert_eq!(rec.recommend(3, 20).unwrap().len(), 9);
}

#[test]
fn matrix_properties_hold() {
    let rec = recommender(topical_corpus(20));
    let m = rec.similarity();
    for i in 0..m.dim() {
        assert!((m.get(i, i).unwrap() - 1.0).abs() < 1e-6);
        for j in 0..m.dim() {
            assert_eq!(m.get(i, j), m.get(j, i));
        }
    }
}

#[test]
fn featured_samples_distinct_articles() {
    let rec = recommender(topical_corpus(12));
    let mut rng = StdRng::seed_from_u64(1);
    let picked = rec.featured(12, &mut rng).unwrap();
    let ids: HashSet<usize> = picked.iter().map(|a| a.id).collect();
    assert_eq!(ids.len(), 12);
    assert!(matches!(rec.featured(13, &mut rng), Err(Error::InvalidArgument(_))));
}

#[test]
fn saved_index_round_trips_and_failed_build_keeps_old_index() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path().join("index"));
    let built = build_index(river_corpus(), VectorizerConfig::default()).unwrap();
    save_index(&paths, &built, "2024-01-01T00:00:00Z".into()).unwrap();

    let loaded = load_recommender(&paths).unwrap();
    assert_eq!(loaded.corpus().len(), 3);
    assert_eq!(loaded.recommend(0, 1).unwrap()[0].id, 1);

    // a corpus with no shared terms never reaches the save step
    let failed = build_index(
        vec![article(0, "alpha"), article(1, "beta"), article(2, "gamma")],
        VectorizerConfig::default(),
    );
    assert!(matches!(failed, Err(Error::EmptyVocabulary(_))));
    assert_eq!(load_recommender(&paths).unwrap().corpus().len(), 3);

    let bigger = build_index(topical_corpus(10), VectorizerConfig::default()).unwrap();
    save_index(&paths, &bigger, "2024-01-02T00:00:00Z".into()).unwrap();
    assert_eq!(load_recommender(&paths).unwrap().corpus().len(), 10);
}

#[test]
fn saved_vectorizer_projects_new_documents() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path().join("index"));
    let built = build_index(river_corpus(), VectorizerConfig::default()).unwrap();
    let cleaned: Vec<&str> = built.corpus.iter().map(|a| a.cleaned_text.as_str()).collect();
    let fitted = built.vectorizer.transform(&cleaned).unwrap();
    save_index(&paths, &built, "2024-01-01T00:00:00Z".into()).unwrap();

    let vectorizer = load_vectorizer(&paths).unwrap();
    assert_eq!(vectorizer.config(), &VectorizerConfig::default());
    assert_eq!(vectorizer.vocabulary(), built.vectorizer.vocabulary());

    let projected = vectorizer.transform(&["river flows zebra", "zebra giraffe"]).unwrap();
    // unknown terms contribute nothing, so this matches the first article
    assert_eq!(projected[0].entries().len(), fitted[0].entries().len());
    for &(term, weight) in fitted[0].entries() {
        let got = projected[0].get(term).unwrap();
        assert!((got - weight).abs() < 1e-6);
    }
    assert!(projected[1].is_empty());
    assert_eq!(projected[1].get(0), None);
}
