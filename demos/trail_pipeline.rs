//! Run the full pipeline over a small inline dataset.
//!
//! Run with: RUST_LOG=debug cargo run --example trail_pipeline

use trail_matcher::journal::{entry_deltas, pace_summary};
use trail_matcher::records::{parse_centerline, parse_shelter_records};
use trail_matcher::{sequence, Pipeline, PipelineConfig, RawHiker, SOUTHERN_TERMINUS};

const SHELTERS: &str = "\
name,dataset,lat,lon,type
Springer Mountain Shelter,ATC,34.627,-84.194,shelter
Springer Mtn Shelter,TNL,34.627,-84.1936,Shelter
Stover Creek Shelter,ATC,34.647,-84.196,shelter
Hawk Mountain Shelter,ATC,34.666,-84.137,shelter
Gooch Mountain Shelter,ATC,34.652,-84.039,shelter
Hawk Mtn Shelter,TNL,34.6659,-84.1401,shelter
";

const CENTERLINE: &str = "\
X,Y
-84.1500,34.6600
-84.19382841799994,34.62669316200002
-84.1950,34.6470
-84.0400,34.6520
";

const HIKERS: [&str; 2] = [
    r#"{
        "identifier": 1,
        "name": "Sunshine",
        "dir": "North",
        "journal": {
            "1": {"date": "Sunday, March 6, 2016", "trip_mileage": 0.0,
                  "start_loc": "Springer Mtn", "dest": "Stover Creek"},
            "2": {"date": "Monday, March 7, 2016", "trip_mileage": 8.1,
                  "start_loc": "Stover Creek Shelter", "dest": "Hawk Mountain"},
            "3": {"date": "Tuesday, March 8, 2016", "trip_mileage": 15.8,
                  "start_loc": "Hawk Mountain Shelter", "dest": "Gooch Mtn"}
        }
    }"#,
    r#"{
        "identifier": 2,
        "name": "Wrong Turn",
        "journal": {
            "1": {"date": "Sunday, March 6, 2016", "trip_mileage": 0.0,
                  "start_loc": "Neels Gap", "dest": null}
        }
    }"#,
];

fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    println!("Trail Pipeline Example\n");

    let (shelters, bad_rows) = parse_shelter_records(SHELTERS);
    println!("Parsed {} shelter rows ({} rejected)", shelters.len(), bad_rows.len());

    let pipeline = Pipeline::from_raw_shelters(&shelters, PipelineConfig::default());
    println!("Catalog:");
    for shelter in pipeline.catalog().iter() {
        println!("  #{:<3} {} ({})", shelter.id, shelter.name, shelter.dataset_origin);
    }

    let mut hikers = Vec::new();
    for json in HIKERS {
        match RawHiker::from_json(json) {
            Ok(hiker) => hikers.push(hiker),
            Err(e) => eprintln!("Skipping hiker: {}", e),
        }
    }

    let output = pipeline.run(&hikers);

    println!("\nHikers:");
    for hiker in &output.hikers {
        println!("  {} ({}): {:?}", hiker.name, hiker.id, hiker.direction);
        let (deltas, _) = entry_deltas(hiker, &pipeline.config().journal);
        for delta in deltas {
            println!(
                "    entry {} [{}] +{:.1} mi over {:?} days",
                delta.entry_num,
                delta.loc_dir.as_deref().unwrap_or("-"),
                delta.delta_mileage,
                delta.delta_days
            );
        }
    }
    for excluded in &output.excluded {
        println!("  excluded: {}", excluded);
    }

    println!("\nUnresolved start locations:");
    for (text, count) in &output.geocode.frequency_start {
        println!("  {:>3}x {}", count, text);
    }

    let (pace, _) = pace_summary(&output.hikers, &pipeline.config().journal);
    if let Some(mean) = pace.corpus_mean {
        println!("\nCorpus mean pace: {:.2} mi/day", mean);
    }

    for divergence in output.strategy_divergences(&pipeline.config().classifier) {
        println!(
            "Hiker {}: index-delta {:?}, bearing {:?}, {} entries differ",
            divergence.hiker_id,
            divergence.index_delta_verdict,
            divergence.bearing_verdict,
            divergence.differing_entries.len()
        );
    }

    let (points, _) = parse_centerline(CENTERLINE);
    match sequence(&points, SOUTHERN_TERMINUS) {
        Ok(ordered) => {
            println!("\nCenterline from the southern terminus:");
            for p in ordered {
                println!("  ({:.4}, {:.4})", p.latitude, p.longitude);
            }
        }
        Err(e) => eprintln!("Sequencing failed: {}", e),
    }
}
