// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Datadeck-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Datadeck and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![cfg(test)]

use super::{Cell, Dataset};

pub(crate) fn small_dataset() -> Dataset {
    Dataset::new(
        vec!["region".to_owned(), "units".to_owned(), "price".to_owned()],
        vec![
            vec![Cell::from("north"), Cell::Int(12), Cell::Float(3.5)],
            vec![Cell::from("south"), Cell::Int(7), Cell::Null],
            vec![Cell::from("east"), Cell::Int(30), Cell::Float(2.25)],
        ],
    )
    .expect("fixture dataset is rectangular")
}

/// `small_dataset` with null rows removed, standing in for a cleaning step's output.
pub(crate) fn cleaned_dataset() -> Dataset {
    let source = small_dataset();
    let rows = source
        .rows()
        .iter()
        .filter(|row| !row.iter().any(Cell::is_null))
        .cloned()
        .collect();
    Dataset::new(source.columns().to_vec(), rows).expect("filtered rows keep their width")
}
