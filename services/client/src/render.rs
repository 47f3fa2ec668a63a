//! services/client/src/render.rs
//!
//! Plain-text views of the workspace and progress screens for the terminal.

use std::fmt::Write;

use zyndle_core::{ChatEntry, ChatRole, Note, ProgressView, QuizReport, QuizState, VideoAnalysis};

pub fn analysis(video: &VideoAnalysis) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", video.title);
    let _ = writeln!(out, "{} · {}", video.channel, video.duration);
    if let Some(views) = &video.view_count {
        let _ = writeln!(out, "{} views", views);
    }
    let _ = writeln!(out, "\nSummary\n{}", video.summary.trim());
    if !video.chapters.is_empty() {
        let _ = writeln!(out, "\nChapters");
        for chapter in &video.chapters {
            let _ = writeln!(out, "  {}", chapter.label());
            if !chapter.description.is_empty() {
                let _ = writeln!(out, "      {}", chapter.description);
            }
        }
    }
    out
}

pub fn chat(entries: &[ChatEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let who = match entry.role {
            ChatRole::User => "you",
            ChatRole::Assistant => "zyndle",
        };
        let _ = writeln!(out, "{}> {}", who, entry.content);
    }
    out
}

pub fn quiz(state: &QuizState) -> String {
    let mut out = String::new();
    for (i, question) in state.questions().iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, question.prompt);
        for (j, option) in question.options.iter().enumerate() {
            let letter = char::from(b'A' + (j % 26) as u8);
            let _ = writeln!(out, "   {}) {}", letter, option);
        }
        if state.is_submitted() {
            let chosen = state.answers().get(&i).copied();
            let mark = if chosen == Some(question.correct_option) {
                "correct"
            } else {
                "incorrect"
            };
            let _ = writeln!(out, "   -> {}: {}", mark, question.explanation);
        }
    }
    out
}

pub fn quiz_report(report: &QuizReport) -> String {
    format!(
        "Score: {}% ({} of {} correct)",
        report.score, report.correct, report.total
    )
}

pub fn notes(notes: &[Note]) -> String {
    let mut out = String::new();
    for note in notes {
        let _ = writeln!(out, "[{}] {}\n    {}", note.id, note.title, note.content);
    }
    out
}

pub fn progress(view: &ProgressView) -> String {
    let s = &view.summary;
    let i = &view.insights;
    let mut out = String::new();
    let _ = writeln!(out, "Videos watched:   {}", s.total_videos_watched);
    let _ = writeln!(out, "Quizzes taken:    {}", s.total_quizzes_taken);
    let _ = writeln!(out, "Average score:    {:.1}%", s.average_quiz_score);
    let _ = writeln!(out, "Learning streak:  {} days", s.learning_streak);
    if !i.learning_style.is_empty() {
        let _ = writeln!(out, "Learning style:   {}", i.learning_style);
    }
    for (label, items) in [
        ("Favorite topics", &i.favorite_topics),
        ("Weak areas", &i.weak_areas),
        ("Recommendations", &i.recommendations),
    ] {
        if items.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{}", label);
        for item in items {
            let _ = writeln!(out, "  - {}", item);
        }
    }
    if !s.recent_activity.is_empty() {
        let _ = writeln!(out, "\nRecent activity");
        for activity in &s.recent_activity {
            let detail = activity
                .description
                .clone()
                .or_else(|| activity.title.clone())
                .unwrap_or_else(|| activity.kind.clone());
            let _ = writeln!(out, "  {}  {}", activity.date, detail);
        }
    }
    out
}
