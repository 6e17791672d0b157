//! Orchestration routine executed by workers.
//!
//! Reads a free-text travel query, runs the train search and the weather
//! lookup, and returns the final answer text.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;

use crate::models::train::{SearchOutcome, SearchRequest};
use crate::services::dates::{format_date, DateError, DateResolver};
use crate::services::llm::{strip_code_fence, LanguageModel, LlmError};
use crate::services::train_search::SearchApi;
use crate::services::weather::WeatherLookup;

/// Answer used when the search completes with no trains at all.
pub const NO_TRAINS_MESSAGE: &str = "해당 날짜에는 조회된 열차가 없습니다.";

const BOOKING_URL: &str = "https://etk.srail.kr";

/// The unit of work a worker executes for each job payload.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    async fn run(&self, query: &str) -> Result<String, OrchestrationError>;
}

/// Stations and date pulled out of a query.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TripRequest {
    pub dep_station: Option<String>,
    pub arr_station: Option<String>,
    pub date: Option<String>,
}

pub struct TravelOrchestrator {
    model: Arc<dyn LanguageModel>,
    search: Arc<dyn SearchApi>,
    weather: Arc<dyn WeatherLookup>,
    dates: DateResolver,
    default_departure: String,
}

impl TravelOrchestrator {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        search: Arc<dyn SearchApi>,
        weather: Arc<dyn WeatherLookup>,
        dates: DateResolver,
        default_departure: &str,
    ) -> Self {
        Self {
            model,
            search,
            weather,
            dates,
            default_departure: default_departure.to_string(),
        }
    }

    async fn extract_trip(&self, query: &str) -> Result<TripRequest, OrchestrationError> {
        let prompt = format!(
            "다음 SRT 기차표 조회 요청에서 출발역, 도착역, 날짜 표현을 추출하세요.\n\
             요청: \"{}\"\n\
             JSON 객체 하나만 출력하세요: \
             {{\"dep_station\": string|null, \"arr_station\": string|null, \"date\": string|null}}\n\
             - 역 이름은 '역' 없이 적습니다 (예: \"수서\", \"부산\").\n\
             - 날짜는 사용자가 쓴 표현 그대로 적습니다 (예: \"내일\", \"2025-05-01\").\n\
             - 알 수 없는 값은 null 로 둡니다.",
            query
        );

        let answer = self.model.generate(&prompt).await?;
        parse_trip(&answer)
    }

    async fn render_trains(
        &self,
        request: &SearchRequest,
        outcome: &SearchOutcome,
    ) -> String {
        match outcome {
            SearchOutcome::Completed(_) if outcome.trains().is_some_and(|t| t.is_empty()) => {
                NO_TRAINS_MESSAGE.to_string()
            }
            SearchOutcome::Completed(data) => {
                let prompt = format!(
                    "당신은 SRT 열차 예매 조회를 돕는 친절한 어시스턴트입니다.\n\
                     {} → {} ({}) 열차 조회 결과입니다:\n{}\n\n\
                     다음 규칙으로 Markdown 답변을 작성하세요.\n\
                     1. 인사와 함께 예매 가능한 열차 수를 요약합니다.\n\
                     2. \"✅ 예매 가능\" 섹션: 오전(05:00-11:59), 오후(12:00-17:59), 저녁/심야(18:00~)로 나누고 \
                     각 열차를 `* **출발시간** 출발 (열차번호) → 도착시간 도착 (가능 좌석)` 한 줄로 적습니다.\n\
                     3. \"❌ 매진\" 섹션: 매진된 열차의 출발 시간을 나열합니다.\n\
                     4. 섹션 사이에 `---` 를 넣습니다.\n\
                     5. 좌석 현황은 실시간으로 바뀔 수 있으니 빠른 예매를 권하고 예매 링크 {} 를 안내합니다.",
                    request.dep_station, request.arr_station, request.dep_date, data, BOOKING_URL
                );
                match self.model.generate(&prompt).await {
                    Ok(listing) => listing.trim().to_string(),
                    Err(e) => {
                        tracing::warn!(error = %e, "Train listing failed, using raw search result");
                        format!(
                            "{} → {} ({}) 열차 조회 결과입니다.\n{}\n\n예매: {}",
                            request.dep_station,
                            request.arr_station,
                            request.dep_date,
                            outcome,
                            BOOKING_URL
                        )
                    }
                }
            }
            SearchOutcome::RemoteError(_) => format!(
                "열차 조회 중 검색 서비스에서 오류가 발생했습니다. ({})",
                outcome
            ),
            SearchOutcome::TimedOut { .. } => format!(
                "열차 조회가 아직 완료되지 않았습니다. 잠시 후 다시 시도해 주세요. ({})",
                outcome
            ),
            SearchOutcome::Transport(_) => {
                format!("열차 조회 서비스에 연결하지 못했습니다. ({})", outcome)
            }
        }
    }

    async fn weather_summary(&self, city: &str, date: NaiveDate) -> String {
        let report = match self.weather.lookup_weather(city, date).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(city = %city, error = %e, "Weather lookup failed");
                return format!("{}의 날씨 정보를 가져오지 못했습니다.", city);
            }
        };

        let prompt = format!(
            "다음 날씨 정보를 여행객을 위해 한두 문장으로 간결하게 요약하세요.\n{}",
            report
        );
        match self.model.generate(&prompt).await {
            Ok(summary) => summary.trim().to_string(),
            Err(e) => {
                tracing::warn!(city = %city, error = %e, "Weather summary failed, using raw report");
                report
            }
        }
    }
}

#[async_trait]
impl Orchestrator for TravelOrchestrator {
    async fn run(&self, query: &str) -> Result<String, OrchestrationError> {
        let trip = self.extract_trip(query).await?;

        let arr_station = trip
            .arr_station
            .filter(|s| !s.trim().is_empty())
            .ok_or(OrchestrationError::MissingArrival)?;
        let dep_station = trip
            .dep_station
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.default_departure.clone());
        let date = self
            .dates
            .resolve_relative_date(trip.date.as_deref().unwrap_or(""))
            .await?;

        let request = SearchRequest {
            dep_station,
            arr_station,
            dep_date: format_date(date),
        };

        let train_section = match self.search.start_search(&request).await {
            Ok(search_job_id) => {
                let outcome = self.search.poll_result(&search_job_id).await;
                self.render_trains(&request, &outcome).await
            }
            Err(e) => {
                tracing::warn!(error = %e, "Train search request failed");
                format!(
                    "열차 조회를 요청하지 못했습니다. (Error requesting train search: {})",
                    e
                )
            }
        };

        let weather_section = self.weather_summary(&request.arr_station, date).await;

        Ok(format!(
            "{}\n\n---\n\n## 🌤️ {} 날씨\n{}",
            train_section, request.arr_station, weather_section
        ))
    }
}

/// Parse the extraction answer, tolerating code fences and stray prose.
pub fn parse_trip(answer: &str) -> Result<TripRequest, OrchestrationError> {
    let body = strip_code_fence(answer);
    let json = match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => body,
    };
    serde_json::from_str(json).map_err(|_| OrchestrationError::Extraction(answer.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error("Language model failed: {0}")]
    Model(#[from] LlmError),

    #[error("Could not read stations and date from model answer: {0}")]
    Extraction(String),

    #[error("Could not determine the arrival station from the query")]
    MissingArrival,

    #[error(transparent)]
    Date(#[from] DateError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trip_with_fence_and_prose() {
        let answer = "결과입니다:\n```json\n{\"dep_station\": null, \"arr_station\": \"부산\", \"date\": \"내일\"}\n```";
        let trip = parse_trip(answer).unwrap();
        assert_eq!(trip.dep_station, None);
        assert_eq!(trip.arr_station.as_deref(), Some("부산"));
        assert_eq!(trip.date.as_deref(), Some("내일"));
    }

    #[test]
    fn test_parse_trip_rejects_non_json() {
        assert!(matches!(
            parse_trip("잘 모르겠습니다"),
            Err(OrchestrationError::Extraction(_))
        ));
    }
}
