// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Datadeck-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Datadeck and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![allow(dead_code)]

// Deterministic benchmark inputs (no RNG).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use datadeck::model::{CacheKey, Cell, Dataset};
use serde_json::{json, Value};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(prefix: &str) -> Self {
        let pid = std::process::id();
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);

        let mut path = std::env::temp_dir();
        path.push(format!("datadeck_bench_{prefix}_{pid}_{nanos}_{counter}"));
        std::fs::create_dir_all(&path).expect("create temp dir");

        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Case {
    Small,
    Medium,
}

impl Case {
    pub fn rows(self) -> usize {
        match self {
            Self::Small => 100,
            Self::Medium => 5_000,
        }
    }
}

/// `rows` x 6 table mixing every cell kind; every 17th price is missing.
pub fn dataset(case: Case) -> Dataset {
    let columns = ["id", "region", "units", "price", "returned", "note"]
        .iter()
        .map(|name| (*name).to_owned())
        .collect();
    let regions = ["north", "south", "east", "west"];

    let rows = (0..case.rows())
        .map(|i| {
            let price = if i % 17 == 0 { Cell::Null } else { Cell::Float(i as f64 * 0.25) };
            vec![
                Cell::Int(i as i64),
                Cell::from(regions[i % regions.len()]),
                Cell::Int((i * 7 % 113) as i64),
                price,
                Cell::Bool(i % 5 == 0),
                Cell::from(format!("order {i}")),
            ]
        })
        .collect();

    Dataset::new(columns, rows).expect("bench dataset is rectangular")
}

/// Typical derived results: an insights summary plus a handful of chart payloads.
pub fn cached_results(case: Case) -> Vec<(CacheKey, Value)> {
    let mut results = vec![(
        CacheKey::new("insights"),
        json!({"rows": case.rows(), "columns": 6, "missing": {"price": case.rows() / 17 + 1}}),
    )];
    for chart in ["bar", "line", "scatter", "histogram"] {
        let key = CacheKey::with_params("visualizations", &json!({"kind": chart}))
            .expect("chart params serialize");
        let points = (0..64).map(|i| json!([i, i * i % 97])).collect::<Vec<_>>();
        results.push((key, json!({"kind": chart, "points": points})));
    }
    results
}
