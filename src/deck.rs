// 抽卡会话引擎：一课的索引池、已记住集合与当前游标。
// 引擎只保存位置（0..N），不持有词条本身；展示层用 DeckSession::current
// 把游标解引用回自己的牌组切片。

use std::collections::BTreeSet;

use rand::{rngs::StdRng, Rng, SeedableRng};
use thiserror::Error;
use tracing::debug;

/// 均匀随机下标来源。
///
/// `pick(bound)` 应返回 `0..bound` 内的值（调用时 `bound > 0`）；
/// 超出范围的值会被 `DeckSession` 取模折回。
pub trait RandomSource {
    fn pick(&mut self, bound: usize) -> usize;
}

impl<F> RandomSource for F
where
    F: FnMut(usize) -> usize,
{
    fn pick(&mut self, bound: usize) -> usize {
        self(bound)
    }
}

/// 基于 `StdRng` 的默认随机来源。
#[derive(Debug, Clone)]
pub struct RngSource(StdRng);

impl RngSource {
    pub fn from_os() -> Self {
        Self(StdRng::from_os_rng())
    }

    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl RandomSource for RngSource {
    fn pick(&mut self, bound: usize) -> usize {
        self.0.random_range(0..bound)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckState {
    /// 牌组为空（N == 0）
    Empty,
    /// 仍有未记住的卡，游标已设置
    Active,
    /// 全部记住，直到下一次 build
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Draw {
    Card(usize),
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Next(usize),
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub remaining: usize,
    pub known: usize,
    pub total: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// 没有游标时调用了 mark_current_known（调用方的 bug）
    #[error("no active card to mark as known")]
    NoActiveCard,
}

#[derive(Debug)]
pub struct DeckSession<S = RngSource> {
    pool: BTreeSet<usize>,
    known: BTreeSet<usize>,
    cursor: Option<usize>,
    source: S,
}

impl<S: RandomSource> DeckSession<S> {
    /// 新会话处于 EMPTY 状态，等待 build。
    pub fn new(source: S) -> Self {
        Self {
            pool: BTreeSet::new(),
            known: BTreeSet::new(),
            cursor: None,
            source,
        }
    }

    /// 以新牌组重建会话；非空时立即抽第一张。
    pub fn build<T>(&mut self, deck: &[T]) -> DeckState {
        self.pool = (0..deck.len()).collect();
        self.known.clear();
        self.cursor = None;
        if !self.pool.is_empty() {
            self.draw();
        }
        debug!(total = self.pool.len(), "deck built");
        self.state()
    }

    /// 从「索引池 − 已记住」中均匀抽一张；候选为空时返回 Exhausted，游标不变。
    pub fn draw(&mut self) -> Draw {
        let candidates: Vec<usize> = self.pool.difference(&self.known).copied().collect();
        if candidates.is_empty() {
            return Draw::Exhausted;
        }
        let pos = candidates[self.source.pick(candidates.len()) % candidates.len()];
        debug_assert!(!self.is_known(pos));
        self.cursor = Some(pos);
        debug!(pos, candidates = candidates.len(), "card drawn");
        Draw::Card(pos)
    }

    /// 把当前卡标为已记住，未全部记住则自动抽下一张。
    pub fn mark_current_known(&mut self) -> Result<Advance, SessionError> {
        let pos = self.cursor.ok_or(SessionError::NoActiveCard)?;
        self.known.insert(pos);
        if self.known.len() == self.pool.len() {
            return Ok(Advance::Complete);
        }
        match self.draw() {
            Draw::Card(next) => Ok(Advance::Next(next)),
            Draw::Exhausted => Ok(Advance::Complete),
        }
    }

    pub fn status(&self) -> Status {
        let total = self.pool.len();
        let known = self.known.len();
        Status {
            remaining: total - known,
            known,
            total,
        }
    }

    pub fn state(&self) -> DeckState {
        if self.pool.is_empty() {
            DeckState::Empty
        } else if self.known.len() == self.pool.len() {
            DeckState::Complete
        } else {
            DeckState::Active
        }
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn current<'d, T>(&self, deck: &'d [T]) -> Option<&'d T> {
        self.cursor.and_then(|pos| deck.get(pos))
    }

    pub fn is_known(&self, pos: usize) -> bool {
        self.known.contains(&pos)
    }
}
