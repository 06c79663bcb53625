//! Betting statistics computed from fetched bet and transaction rows.

use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 1000.0;

/// Round to `places` decimals, half away from zero.
pub fn round_to(n: f64, places: i32) -> f64 {
    let f = 10f64.powi(places);
    (n * f).round() / f
}

fn money(n: f64) -> f64 {
    round_to(n, 2)
}

/// Lower bound on `bet_date` for a bet statistics `period`; `None` means unbounded.
/// Unknown values fall back to the last 30 days.
pub fn bet_period_start(period: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match period {
        "7j" => Some(now - Duration::days(7)),
        "30j" => Some(now - Duration::days(30)),
        "3m" => now.checked_sub_months(Months::new(3)),
        "6m" => now.checked_sub_months(Months::new(6)),
        "1an" => now.checked_sub_months(Months::new(12)),
        "all" => None,
        _ => Some(now - Duration::days(30)),
    }
}

/// Lower bound on `transaction_date` for a transaction `period`.
pub fn transaction_period_start(period: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match period {
        "7j" => Some(now - Duration::days(7)),
        "30j" => Some(now - Duration::days(30)),
        "90j" => Some(now - Duration::days(90)),
        "1an" => now.checked_sub_months(Months::new(12)),
        "tout" => None,
        _ => Some(now - Duration::days(30)),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BetResult {
    Won,
    Lost,
    Void,
    Pending,
}

impl BetResult {
    /// Missing or unrecognised results count as pending.
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("won") => BetResult::Won,
            Some("lost") => BetResult::Lost,
            Some("void") => BetResult::Void,
            _ => BetResult::Pending,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BetRecord {
    pub bet_date: Option<NaiveDate>,
    pub stake: f64,
    pub global_odds: f64,
    pub result: BetResult,
}

impl BetRecord {
    /// Decode a row as returned by the CRUD layer (numeric columns as numbers, dates as strings).
    pub fn from_row(row: &Value) -> Self {
        let num = |k: &str| match row.get(k) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or_default(),
            Some(Value::String(s)) => s.parse().unwrap_or_default(),
            _ => 0.0,
        };
        BetRecord {
            bet_date: row.get("bet_date").and_then(Value::as_str).and_then(parse_day),
            stake: num("stake"),
            global_odds: num("global_odds"),
            result: BetResult::parse(row.get("result").and_then(Value::as_str)),
        }
    }

    pub fn profit_loss(&self) -> f64 {
        match self.result {
            BetResult::Won => self.stake * self.global_odds - self.stake,
            BetResult::Lost => -self.stake,
            BetResult::Void | BetResult::Pending => 0.0,
        }
    }
}

/// Leading `YYYY-MM-DD` of a date or timestamp string.
fn parse_day(s: &str) -> Option<NaiveDate> {
    s.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

#[derive(Debug, Serialize, PartialEq)]
pub struct BetStats {
    pub total_bets: usize,
    pub total_stake: f64,
    pub total_wins: f64,
    pub total_losses: f64,
    pub total_profit_loss: f64,
    pub average_odds: Option<f64>,
    pub won_bets: usize,
    pub lost_bets: usize,
    pub pending_bets: usize,
    pub win_rate: f64,
    pub roi: f64,
}

pub fn bet_stats(bets: &[BetRecord]) -> BetStats {
    let total_bets = bets.len();
    let total_stake: f64 = bets.iter().map(|b| b.stake).sum();
    let total_wins: f64 = bets
        .iter()
        .filter(|b| b.result == BetResult::Won)
        .map(BetRecord::profit_loss)
        .sum();
    let total_losses: f64 = bets
        .iter()
        .filter(|b| b.result == BetResult::Lost)
        .map(BetRecord::profit_loss)
        .sum();
    let total_profit_loss = total_wins + total_losses;
    let count = |r: BetResult| bets.iter().filter(|b| b.result == r).count();
    let won_bets = count(BetResult::Won);
    let average_odds = (total_bets > 0)
        .then(|| round_to(bets.iter().map(|b| b.global_odds).sum::<f64>() / total_bets as f64, 3));
    let win_rate = if total_bets > 0 {
        won_bets as f64 / total_bets as f64 * 100.0
    } else {
        0.0
    };
    let roi = if total_stake > 0.0 {
        total_profit_loss / total_stake * 100.0
    } else {
        0.0
    };
    BetStats {
        total_bets,
        total_stake: money(total_stake),
        total_wins: money(total_wins),
        total_losses: money(total_losses),
        total_profit_loss: money(total_profit_loss),
        average_odds,
        won_bets,
        lost_bets: count(BetResult::Lost),
        pending_bets: count(BetResult::Pending),
        win_rate: money(win_rate),
        roi: money(roi),
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Streaks {
    pub max_win: usize,
    pub max_lose: usize,
    pub current_win: usize,
    pub current_lose: usize,
}

/// Win/loss runs over settled bets in date order; void and pending bets are skipped.
pub fn streaks(bets: &[BetRecord]) -> Streaks {
    let mut s = Streaks::default();
    for b in bets {
        match b.result {
            BetResult::Won => {
                s.current_win += 1;
                s.current_lose = 0;
                s.max_win = s.max_win.max(s.current_win);
            }
            BetResult::Lost => {
                s.current_lose += 1;
                s.current_win = 0;
                s.max_lose = s.max_lose.max(s.current_lose);
            }
            BetResult::Void | BetResult::Pending => {}
        }
    }
    s
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DetailedStats {
    pub in_play_stake: f64,
    pub max_stake: Option<f64>,
    pub min_stake: Option<f64>,
    pub biggest_won_odds: Option<f64>,
    pub smallest_won_odds: Option<f64>,
    pub biggest_profit: Option<f64>,
    /// Absolute value of the largest single loss.
    pub biggest_loss: Option<f64>,
    pub max_win_streak: Option<usize>,
    pub max_lose_streak: Option<usize>,
    pub current_win_streak: usize,
    pub current_lose_streak: usize,
}

fn fold_max(it: impl Iterator<Item = f64>) -> Option<f64> {
    it.fold(None, |acc, x| Some(acc.map_or(x, |m: f64| m.max(x))))
}

fn fold_min(it: impl Iterator<Item = f64>) -> Option<f64> {
    it.fold(None, |acc, x| Some(acc.map_or(x, |m: f64| m.min(x))))
}

/// Expects `bets` ordered by date ascending.
pub fn detailed_stats(bets: &[BetRecord]) -> DetailedStats {
    let won = || bets.iter().filter(|b| b.result == BetResult::Won);
    let in_play_stake = bets
        .iter()
        .filter(|b| b.result == BetResult::Pending)
        .map(|b| b.stake)
        .sum();
    let biggest_profit = fold_max(bets.iter().map(BetRecord::profit_loss)).filter(|p| *p > 0.0);
    let biggest_loss = fold_min(bets.iter().map(BetRecord::profit_loss)).filter(|p| *p < 0.0);
    let s = streaks(bets);
    DetailedStats {
        in_play_stake: money(in_play_stake),
        max_stake: fold_max(bets.iter().map(|b| b.stake)).map(money),
        min_stake: fold_min(bets.iter().map(|b| b.stake)).map(money),
        biggest_won_odds: fold_max(won().map(|b| b.global_odds)).map(|o| round_to(o, 3)),
        smallest_won_odds: fold_min(won().map(|b| b.global_odds)).map(|o| round_to(o, 3)),
        biggest_profit: biggest_profit.map(money),
        biggest_loss: biggest_loss.map(|l| money(l.abs())),
        max_win_streak: (s.max_win > 0).then_some(s.max_win),
        max_lose_streak: (s.max_lose > 0).then_some(s.max_lose),
        current_win_streak: s.current_win,
        current_lose_streak: s.current_lose,
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CapitalPoint {
    pub date: String,
    pub capital: f64,
    pub daily_profit_loss: f64,
    pub cumulative_profit_loss: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CapitalEvolution {
    /// Capital after each day, aligned with `labels`.
    pub data: Vec<f64>,
    /// `dd/mm` label per day.
    pub labels: Vec<String>,
    pub capital_evolution: Vec<CapitalPoint>,
    pub initial_capital: f64,
    pub current_capital: f64,
    pub total_profit_loss: f64,
    pub total_profit_loss_percentage: f64,
}

/// Daily cumulative capital from `initial`. Undated bets are ignored; no bets yields a single point for `today`.
pub fn capital_evolution(bets: &[BetRecord], initial: f64, today: NaiveDate) -> CapitalEvolution {
    let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for b in bets {
        if let Some(day) = b.bet_date {
            *daily.entry(day).or_default() += b.profit_loss();
        }
    }
    if daily.is_empty() {
        return CapitalEvolution {
            data: vec![initial],
            labels: vec![today.format("%d/%m").to_string()],
            capital_evolution: vec![CapitalPoint {
                date: today.format("%Y-%m-%d").to_string(),
                capital: initial,
                daily_profit_loss: 0.0,
                cumulative_profit_loss: 0.0,
            }],
            initial_capital: initial,
            current_capital: initial,
            total_profit_loss: 0.0,
            total_profit_loss_percentage: 0.0,
        };
    }
    let mut data = Vec::with_capacity(daily.len());
    let mut labels = Vec::with_capacity(daily.len());
    let mut points = Vec::with_capacity(daily.len());
    let mut cumulative = 0.0;
    for (day, pl) in &daily {
        cumulative += pl;
        let capital = money(initial + cumulative);
        data.push(capital);
        labels.push(day.format("%d/%m").to_string());
        points.push(CapitalPoint {
            date: day.format("%Y-%m-%d").to_string(),
            capital,
            daily_profit_loss: money(*pl),
            cumulative_profit_loss: money(cumulative),
        });
    }
    let percentage = if initial != 0.0 {
        cumulative / initial * 100.0
    } else {
        0.0
    };
    CapitalEvolution {
        data,
        labels,
        capital_evolution: points,
        initial_capital: money(initial),
        current_capital: money(initial + cumulative),
        total_profit_loss: money(cumulative),
        total_profit_loss_percentage: money(percentage),
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TransactionStats {
    pub total_deposits: f64,
    pub total_withdrawals: f64,
    pub net_deposits: f64,
}

/// Sums `(type, amount)` pairs; types other than deposit/withdraw are ignored.
pub fn transaction_stats<'a>(rows: impl IntoIterator<Item = (&'a str, f64)>) -> TransactionStats {
    let (mut deposits, mut withdrawals) = (0.0, 0.0);
    for (kind, amount) in rows {
        match kind {
            "deposit" => deposits += amount,
            "withdraw" => withdrawals += amount,
            _ => {}
        }
    }
    TransactionStats {
        total_deposits: money(deposits),
        total_withdrawals: money(withdrawals),
        net_deposits: money(deposits - withdrawals),
    }
}

/// `{label, value}` option with the first letter capitalised in the label.
pub fn filter_option(value: &str) -> Value {
    let mut chars = value.chars();
    let label = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    serde_json::json!({ "label": label, "value": value })
}
