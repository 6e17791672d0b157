//! Test fixtures: sample queries and external search payloads

#![allow(dead_code)]

use serde_json::{json, Value};

/// A travel query with the search request it should produce.
#[derive(Debug, Clone)]
pub struct QueryFixture {
    pub query: &'static str,
    pub dep_station: &'static str,
    pub arr_station: &'static str,
    pub description: &'static str,
}

pub const QUERY_FIXTURES: &[QueryFixture] = &[
    QueryFixture {
        query: "내일 부산 가는 SRT 기차표",
        dep_station: "수서",
        arr_station: "부산",
        description: "Relative date, implicit departure station",
    },
    QueryFixture {
        query: "모레 동탄에서 목포 가는 SRT 좌석 있어?",
        dep_station: "동탄",
        arr_station: "목포",
        description: "Explicit departure station",
    },
];

/// Search payload with one available and one sold-out train.
pub fn busan_trains() -> Value {
    json!([
        {
            "train_no": "301",
            "dep_time": "08:00",
            "arr_time": "10:30",
            "general_seat": "예약하기",
            "special_seat": "매진"
        },
        {
            "train_no": "305",
            "dep_time": "09:00",
            "arr_time": "11:32",
            "general_seat": "매진",
            "special_seat": "매진"
        }
    ])
}

/// Search payload for a date with no trains.
pub fn no_trains() -> Value {
    json!({ "trains": [] })
}
