//! Sample profits used by `SEED_ON_START` and by the test fixtures.

use chrono::{TimeZone, Utc};

use crate::api::{Profit, ProfitId};

const SAMPLE_IDS: [&str; 3] = [
    "5a9d6e3c1f4e2b0001000001",
    "5a9d6e3c1f4e2b0001000002",
    "5a9d6e3c1f4e2b0001000003",
];

/// Three fixed profits with stable identifiers.
pub fn sample_profits() -> Vec<Profit> {
    let rows = [
        (100.0, "Payment 1", 2018, 1),
        (150.0, "Payment 2", 2018, 2),
        (175.5, "Payment 3", 2017, 6),
    ];

    SAMPLE_IDS
        .iter()
        .zip(rows)
        .filter_map(|(id, (amount, name, year, month))| {
            Some(Profit {
                id: ProfitId::parse(id).ok()?,
                amount,
                name: name.to_string(),
                year: Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()?,
            })
        })
        .collect()
}
