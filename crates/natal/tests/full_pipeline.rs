mod common;

use chrono::{TimeZone, Utc};
use common::{birth, drain, open_assembler, subject};
use natal_context::TurnRequest;
use natal_core::{Config, Role, TopicKey};
use natal_store::{decode_chart, ChartRepo, Database};
use tempfile::TempDir;

#[tokio::test]
async fn test_summaries_survive_reopen() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("natal.db");
    let config = Config::default();
    let request = TurnRequest::new([TopicKey::Planets, TopicKey::Yogas]);

    {
        let assembler = open_assembler(&db_path, &config);
        assembler.charts().onboard(&subject(), &birth()).await.unwrap();
        let first = assembler.assemble(&subject(), &request).await.unwrap();
        assert!(first.summaries.iter().all(|r| !r.is_hit()));
        drain(&assembler).await;
    }

    let assembler = open_assembler(&db_path, &config);
    let context = assembler.assemble(&subject(), &request).await.unwrap();
    assert!(context.summaries.iter().all(|r| r.is_hit()));
    let planets = context.summaries[0].summary.as_deref().unwrap();
    assert!(planets.starts_with("Sun sign: Pisces. Sun house: 6"));
}

#[tokio::test]
async fn test_stored_blob_is_compressed_and_decodes() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("natal.db");
    let assembler = open_assembler(&db_path, &Config::default());
    assembler.charts().onboard(&subject(), &birth()).await.unwrap();

    let repo = ChartRepo::new(Database::open(&db_path).unwrap());
    let stats = repo.stats(&subject()).unwrap().unwrap();
    assert!(stats.stored_bytes < stats.raw_bytes);
    assert_eq!(repo.get(&subject()).unwrap().unwrap(), common::sample_chart());

    let payload: Vec<u8> = Database::open(&db_path)
        .unwrap()
        .with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT payload FROM charts WHERE subject_id = ?1",
                [subject().as_str()],
                |row| row.get(0),
            )?)
        })
        .unwrap();
    assert_eq!(decode_chart(&payload).unwrap(), common::sample_chart());
}

#[tokio::test]
async fn test_corrupt_blob_is_recomputed_from_birth_data() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("natal.db");
    let assembler = open_assembler(&db_path, &Config::default());
    assembler.charts().onboard(&subject(), &birth()).await.unwrap();

    Database::open(&db_path)
        .unwrap()
        .with_conn(|conn| {
            conn.execute("UPDATE charts SET payload = x'00ff00'", [])?;
            Ok(())
        })
        .unwrap();

    let loaded = assembler.charts().load(&subject()).await.unwrap();
    assert_eq!(loaded.generation, 1);
    assert_eq!(loaded.chart["planets"]["Sun"]["sign"], "Pisces");

    let repo = ChartRepo::new(Database::open(&db_path).unwrap());
    assert!(repo.get(&subject()).unwrap().is_some());
    assert_eq!(repo.birth_data(&subject()).unwrap(), Some(birth()));
}

#[tokio::test]
async fn test_long_conversation_stays_bounded() {
    let temp = TempDir::new().unwrap();
    let config = Config::default();
    let assembler = open_assembler(&temp.path().join("natal.db"), &config);
    assembler.charts().onboard(&subject(), &birth()).await.unwrap();

    for i in 0..40 {
        assembler
            .record_turn(
                &subject(),
                &format!("Question {i} about my chart."),
                &format!("Answer {i}. It depends on the dasha."),
            )
            .unwrap();
        drain(&assembler).await;

        let live = assembler
            .window()
            .conversation(&subject())
            .unwrap()
            .iter()
            .filter(|m| m.role != Role::Summary)
            .count();
        assert!(live <= config.window.threshold(), "turn {i}: {live} live messages");
    }

    let conversation = assembler.window().conversation(&subject()).unwrap();
    assert_eq!(conversation[0].role, Role::Summary);
    assert!(!conversation[0].text.is_empty());
    assert_eq!(conversation.last().unwrap().text, "Answer 39. It depends on the dasha.");
    assert_eq!(assembler.window().history(&subject(), 1000).unwrap().len(), 80);
}

#[tokio::test]
async fn test_turn_context_for_a_range_question() {
    let temp = TempDir::new().unwrap();
    let assembler = open_assembler(&temp.path().join("natal.db"), &Config::default());
    assembler.charts().onboard(&subject(), &birth()).await.unwrap();

    let from = Utc.with_ymd_and_hms(2015, 3, 1, 0, 0, 0).unwrap();
    let to = Utc.with_ymd_and_hms(2015, 7, 1, 0, 0, 0).unwrap();
    let context = assembler
        .assemble(
            &subject(),
            &TurnRequest::new([TopicKey::Dasha]).with_range(from, to),
        )
        .await
        .unwrap();

    assert_eq!(context.current.major.as_ref().unwrap().planet, "Rahu");
    assert_eq!(context.current.sub.as_ref().unwrap().planet, "Rahu");
    assert!(context.current.sub_sub.is_none());

    let major = &context.periods[0];
    assert_eq!(major.planet, "Rahu");
    assert_eq!(major.children.len(), 1);
    let sub = &major.children[0];
    assert_eq!(sub.planet, "Jupiter");
    let sub_subs: Vec<_> = sub.children.iter().map(|n| n.planet.as_str()).collect();
    assert_eq!(sub_subs, vec!["Jupiter", "Saturn"]);

    let dasha = context.summaries[0].raw_slice.as_ref().unwrap();
    assert_eq!(dasha["next"]["planet"], "Jupiter");
}
