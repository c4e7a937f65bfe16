use book_features::dataset::{encode_records, fit_encoders};
use book_features::schema::NUMERIC_WIDTH;
use book_features::{
    AgeScaler, BookFeatureTable, CategoricalField, Dataset, EncoderStore, FeatureBatch,
    RawRatingRecord, UserProfile,
};
use std::fs;

const RAW_CSV: &str = "\
title,author,category,preferred_topics,country,gender,is_new_muslim,born_muslim,education_level,religious_level,age,average_rating,user_rating_count,rating
The Sealed Nectar,Safiur Rahman,Seerah,History,Egypt,Male,No,Yes,Master,4,37.5,4.8,210,5
Fortress of the Muslim,Said Al-Qahtani,Dua,Faith,UK,Female,Yes,No,Bachelor,2,24,4.7,180,4
In the Footsteps of the Prophet,Tariq Ramadan,Seerah,History,UK,Male,No,Yes,PhD,3,50.5,4.1,95,3
The Sealed Nectar,Safiur Rahman,Seerah,Faith,Egypt,Female,Yes,No,Bachelor,5,31,4.8,210,4
";

fn prepared() -> (EncoderStore, Dataset) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("raw.csv");
    fs::write(&path, RAW_CSV).unwrap();

    let raw = RawRatingRecord::read_csv(&path).unwrap();
    let store = fit_encoders(&raw, AgeScaler::default());
    let dataset = encode_records(&raw, &store).unwrap();
    (store, dataset)
}

#[test]
fn test_bundle_survives_save_and_load() {
    let (store, _) = prepared();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("encoders.json");
    store.save(&path).unwrap();

    let loaded = EncoderStore::load(&path).unwrap();
    assert_eq!(loaded, store);
    assert!(loaded.validate().is_ok());

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["encoders"]["country"], serde_json::json!(["Egypt", "UK"]));
    assert_eq!(json["age_scaler"]["mean"], 37.5);
}

#[test]
fn test_user_batch_covers_every_book() {
    let (store, dataset) = prepared();
    let table = BookFeatureTable::from_records(dataset.records()).unwrap();
    assert_eq!(table.len(), 3);

    let profile: UserProfile = serde_json::from_value(serde_json::json!({
        "age": 37.5,
        "country": "UK",
        "gender": "Female",
        "is_new_muslim": "Yes",
        "born_muslim": "No",
        "education_level": "PhD",
        "religious_level": 2,
        "preferred_topic": "Faith"
    }))
    .unwrap();
    let user = profile.encode(&store).unwrap();
    let batch = FeatureBatch::for_user(&user, &table);

    assert_eq!(batch.len(), table.len());
    assert_eq!(batch.numeric().ncols(), NUMERIC_WIDTH);
    assert_eq!(batch.column(CategoricalField::BookIdx).to_vec(), vec![0, 1, 2]);
    // Scaled age of the scaler's own mean.
    assert!(batch.numeric().column(0).iter().all(|&age| age == 0.0));

    for (row, book) in table.iter().enumerate() {
        assert_eq!(batch.column(CategoricalField::AuthorIdx)[row], book.author_idx);
        assert_eq!(batch.column(CategoricalField::Category)[row], book.category);
        assert_eq!(batch.numeric()[[row, 1]], book.average_rating);
    }

    let title = store.decode_title(0).unwrap();
    assert_eq!(title, "Fortress of the Muslim");
}
