//! 解析事件
//!
//! 解析器在运行过程中按顺序发布事件，监听器只观察，不影响结果。

use std::fmt;

use crate::candidate::Phase;

/// 解析事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionEvent<'a> {
    /// 解析开始
    RunStarted { candidates: usize },

    /// 进入某个阶段
    PhaseStarted { phase: Phase, candidates: usize },

    /// 候选已激活
    CandidateActivated { candidate: &'a str, phase: Phase },

    /// 候选被跳过
    CandidateSkipped {
        candidate: &'a str,
        phase: Phase,
        reason: &'a str,
    },

    /// 解析完成
    RunCompleted { activated: usize, skipped: usize },
}

impl ResolutionEvent<'_> {
    /// 事件名称
    pub fn event_name(&self) -> &'static str {
        match self {
            ResolutionEvent::RunStarted { .. } => "RunStarted",
            ResolutionEvent::PhaseStarted { .. } => "PhaseStarted",
            ResolutionEvent::CandidateActivated { .. } => "CandidateActivated",
            ResolutionEvent::CandidateSkipped { .. } => "CandidateSkipped",
            ResolutionEvent::RunCompleted { .. } => "RunCompleted",
        }
    }
}

impl fmt::Display for ResolutionEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionEvent::RunStarted { candidates } => {
                write!(f, "resolution started with {} candidate(s)", candidates)
            }
            ResolutionEvent::PhaseStarted { phase, candidates } => {
                write!(f, "phase {} started with {} candidate(s)", phase, candidates)
            }
            ResolutionEvent::CandidateActivated { candidate, phase } => {
                write!(f, "'{}' activated in phase {}", candidate, phase)
            }
            ResolutionEvent::CandidateSkipped {
                candidate,
                phase,
                reason,
            } => write!(f, "'{}' skipped in phase {}: {}", candidate, phase, reason),
            ResolutionEvent::RunCompleted { activated, skipped } => write!(
                f,
                "resolution completed: {} activated, {} skipped",
                activated, skipped
            ),
        }
    }
}

/// 解析监听器 trait
///
/// 事件在解析线程上同步投递
pub trait ResolutionListener: Send + Sync {
    /// 处理事件
    fn on_event(&self, event: &ResolutionEvent<'_>);

    /// 获取监听器名称（用于日志）
    fn listener_name(&self) -> &str {
        "AnonymousListener"
    }
}

/// 将事件写入 tracing 日志的监听器
#[derive(Debug, Default)]
pub struct LoggingResolutionListener;

impl LoggingResolutionListener {
    pub fn new() -> Self {
        Self
    }
}

impl ResolutionListener for LoggingResolutionListener {
    fn on_event(&self, event: &ResolutionEvent<'_>) {
        match event {
            ResolutionEvent::CandidateActivated { .. } | ResolutionEvent::CandidateSkipped { .. } => {
                tracing::debug!("{}", event)
            }
            _ => tracing::info!("{}", event),
        }
    }

    fn listener_name(&self) -> &str {
        "LoggingResolutionListener"
    }
}
