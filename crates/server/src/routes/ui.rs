//! Single-page HTML form: two selectors, a question box, sample questions and
//! one output block.
use crate::state::{EngineState, ServerState};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::Form;
use matcher::{
    FilterOptions, QueryOutcome, ALL, EMPTY_QUERY_NOTICE, FALLBACK_NOTICE, SAMPLE_QUESTIONS,
};
use serde::Deserialize;
use std::fmt::Write as _;
use std::sync::Arc;

const TITLE: &str = "SHL Assessment Recommendation Engine";

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub sample: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendForm {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub job_level: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
}

/// Output block shown under the form.
enum Output {
    Empty,
    Info(&'static str),
    Answer { text: String, warning: Option<&'static str> },
    Error(String),
}

/// Escape text for inclusion in HTML element content and attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// GET `/`: the form, optionally prefilled with a sample question.
pub async fn index_page(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<PageParams>,
) -> impl IntoResponse {
    let engine = state.engine();
    let EngineState::Ready { options, .. } = engine.as_ref() else {
        return halted_page(&engine);
    };

    let session = {
        let mut session = state.session();
        if let Some(index) = params.sample {
            session.select_sample(index);
        }
        session.clone()
    };

    (
        StatusCode::OK,
        Html(render_page(
            options,
            session.last_query.as_deref().unwrap_or(""),
            session.job_level.as_deref(),
            session.duration.as_deref(),
            &Output::Empty,
        )),
    )
}

/// POST `/recommend`: run the query and render the result under the form.
pub async fn submit_form(
    State(state): State<Arc<ServerState>>,
    Form(form): Form<RecommendForm>,
) -> impl IntoResponse {
    let engine = state.engine();
    let EngineState::Ready {
        recommender,
        options,
    } = engine.as_ref()
    else {
        return halted_page(&engine);
    };

    let criteria = state.session().submit(
        &form.query,
        form.job_level.as_deref(),
        form.duration.as_deref(),
    );

    let output = if form.query.trim().is_empty() {
        Output::Info(EMPTY_QUERY_NOTICE)
    } else {
        match recommender.recommend(&form.query, &criteria).await {
            QueryOutcome::Meta { answer } => Output::Answer {
                text: answer.to_string(),
                warning: None,
            },
            QueryOutcome::Answered(rec) => Output::Answer {
                warning: rec.fallback.then_some(FALLBACK_NOTICE),
                text: rec.answer,
            },
            QueryOutcome::Failed(failure) => Output::Error(failure.diagnostic()),
        }
    };

    (
        StatusCode::OK,
        Html(render_page(
            options,
            &form.query,
            form.job_level.as_deref(),
            form.duration.as_deref(),
            &output,
        )),
    )
}

fn halted_page(engine: &EngineState) -> (StatusCode, Html<String>) {
    let diagnostic = match engine {
        EngineState::Halted { diagnostic, .. } => diagnostic.as_str(),
        EngineState::Ready { .. } => "",
    };
    let body = format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{TITLE}</title></head>\
         <body><h1>{TITLE}</h1><div class=\"error\">{}</div></body></html>",
        escape_html(diagnostic)
    );
    (StatusCode::SERVICE_UNAVAILABLE, Html(body))
}

fn render_select(
    out: &mut String,
    name: &str,
    label: &str,
    values: &[String],
    selected: Option<&str>,
) {
    // Values no longer offered (e.g. after a reload) fall back to "All".
    let selected = selected
        .filter(|s| values.iter().any(|v| v.as_str() == *s))
        .unwrap_or(ALL);
    let _ = write!(out, "<label>{label} <select name=\"{name}\">");
    for value in values {
        let mark = if value == selected { " selected" } else { "" };
        let value = escape_html(value);
        let _ = write!(out, "<option value=\"{value}\"{mark}>{value}</option>");
    }
    out.push_str("</select></label>\n");
}

fn render_page(
    options: &FilterOptions,
    query: &str,
    job_level: Option<&str>,
    duration: Option<&str>,
    output: &Output,
) -> String {
    let mut page = String::with_capacity(4096);
    let _ = write!(
        page,
        "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>{TITLE}</title></head>\n<body>\n<h1>{TITLE}</h1>\n"
    );

    page.push_str("<form method=\"post\" action=\"/recommend\">\n");
    render_select(&mut page, "job_level", "Job Level", &options.job_levels, job_level);
    render_select(&mut page, "duration", "Test Duration (minutes)", &options.durations, duration);
    let _ = write!(
        page,
        "<textarea name=\"query\" rows=\"3\" cols=\"80\">{}</textarea>\n\
         <button type=\"submit\">Get Recommendation</button>\n</form>\n",
        escape_html(query)
    );

    page.push_str("<h2>Sample questions</h2>\n<ul>\n");
    for (index, question) in SAMPLE_QUESTIONS.iter().enumerate() {
        let _ = writeln!(
            page,
            "<li><a href=\"/?sample={index}\">{}</a></li>",
            escape_html(question)
        );
    }
    page.push_str("</ul>\n");

    match output {
        Output::Empty => {}
        Output::Info(text) => {
            let _ = writeln!(page, "<div class=\"info\">{}</div>", escape_html(text));
        }
        Output::Answer { text, warning } => {
            if let Some(warning) = warning {
                let _ = writeln!(page, "<div class=\"warning\">{}</div>", escape_html(warning));
            }
            let _ = writeln!(page, "<div class=\"answer\"><pre>{}</pre></div>", escape_html(text));
        }
        Output::Error(text) => {
            let _ = writeln!(page, "<div class=\"error\">{}</div>", escape_html(text));
        }
    }

    page.push_str("</body></html>\n");
    page
}
