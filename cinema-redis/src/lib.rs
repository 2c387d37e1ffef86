//! Redis-backed fast reserved-seat index (C2).
//!
//! Atomicity and serialization for a cinema's seat set come from a
//! single Lua script evaluated server-side against one hash key,
//! `cinema:<id>:seats`, with fields `"<row>:<col>"`. This mirrors the
//! original service's `reserve.lua`/`cancel.lua` scripts run via
//! `EVALSHA`; conflict and distance-violation outcomes are distinguished
//! by a tagged-prefix error raised from the script (`[SEATS_RESERVED]`
//! / `[MIN_DISTANCE_VIOLATION]`) and parsed back into typed variants
//! here.

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use cinema_core::{AtomicClaim, AtomicRelease, ClaimOutcome, FastIndexError, ReadMembers, SeatCoord, SeedIndex};
use cinema_runtime::metrics::FastIndexMetrics;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError, Script};
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;
use tokio::sync::OnceCell;

/// Claims every field in `KEYS[1]` atomically, honoring a minimum
/// Manhattan distance against existing members and against the batch
/// itself.
///
/// `ARGV[1]` is `min_distance`; `ARGV[2..]` are `"row:col"` fields to
/// claim, in the same order the caller supplied them.
const RESERVE_SCRIPT: &str = r"
local key = KEYS[1]
local min_distance = tonumber(ARGV[1])
local batch = {}
for i = 2, #ARGV do
    batch[#batch + 1] = ARGV[i]
end

local function parse(field)
    local r, c = field:match('^(-?%d+):(-?%d+)$')
    return tonumber(r), tonumber(c)
end

local function distance(a_row, a_col, b_row, b_col)
    local dr = a_row - b_row
    local dc = a_col - b_col
    if dr < 0 then dr = -dr end
    if dc < 0 then dc = -dc end
    return dr + dc
end

-- conflict check: any batch field already a member, or repeated within the batch itself
local seen = {}
local conflicts = {}
for _, field in ipairs(batch) do
    if redis.call('HEXISTS', key, field) == 1 or seen[field] then
        conflicts[#conflicts + 1] = field
    end
    seen[field] = true
end
if #conflicts > 0 then
    return redis.error_reply('[SEATS_RESERVED] ' .. table.concat(conflicts, ','))
end

-- distance check: batch-vs-existing and batch-vs-batch, compared by position so a
-- repeated "row:col" entry still measures its distance against its own duplicate
if min_distance > 0 then
    local existing = redis.call('HKEYS', key)
    local violations = {}
    for i, field in ipairs(batch) do
        local br, bc = parse(field)
        for _, existing_field in ipairs(existing) do
            local er, ec = parse(existing_field)
            if distance(br, bc, er, ec) < min_distance then
                violations[#violations + 1] = field
            end
        end
        for j, other in ipairs(batch) do
            if i ~= j then
                local orow, ocol = parse(other)
                if distance(br, bc, orow, ocol) < min_distance then
                    violations[#violations + 1] = field
                end
            end
        end
    end
    if #violations > 0 then
        return redis.error_reply('[MIN_DISTANCE_VIOLATION] ' .. table.concat(violations, ','))
    end
end

for _, field in ipairs(batch) do
    redis.call('HSET', key, field, '1')
end
return 'OK'
";

/// Removes every field in `ARGV` from `KEYS[1]`. Missing fields are
/// ignored.
const CANCEL_SCRIPT: &str = r"
local key = KEYS[1]
for i = 1, #ARGV do
    redis.call('HDEL', key, ARGV[i])
end
return 'OK'
";

async fn reserve_script() -> &'static Script {
    static SCRIPT: OnceCell<Script> = OnceCell::const_new();
    SCRIPT.get_or_init(|| async { Script::new(RESERVE_SCRIPT) }).await
}

async fn cancel_script() -> &'static Script {
    static SCRIPT: OnceCell<Script> = OnceCell::const_new();
    SCRIPT.get_or_init(|| async { Script::new(CANCEL_SCRIPT) }).await
}

/// Key for a cinema's fast-index hash.
#[must_use]
pub fn cinema_key(cinema_id: i64) -> String {
    format!("cinema:{cinema_id}:seats")
}

fn parse_tagged_error(err: &RedisError, seats: &[SeatCoord]) -> FastIndexError {
    let message = err.to_string();
    if message.contains("[SEATS_RESERVED]") {
        FastIndexError::Conflict(fields_to_coords(&message, seats))
    } else if message.contains("[MIN_DISTANCE_VIOLATION]") {
        FastIndexError::DistanceViolation(fields_to_coords(&message, seats))
    } else {
        FastIndexError::Internal(message)
    }
}

/// Best-effort mapping of the script's comma-separated field list back
/// to `SeatCoord`s; falls back to the full batch if parsing the
/// message fails (the caller only needs the outcome variant, the exact
/// offending subset is informational).
fn fields_to_coords(message: &str, batch: &[SeatCoord]) -> Vec<SeatCoord> {
    let Some(list) = message.split(']').nth(1) else {
        return batch.to_vec();
    };
    let mut coords = Vec::new();
    for field in list.trim().split(',') {
        let mut parts = field.trim().splitn(2, ':');
        if let (Some(row), Some(col)) = (parts.next(), parts.next()) {
            if let (Ok(row), Ok(col)) = (row.parse(), col.parse()) {
                coords.push(SeatCoord::new(row, col));
            }
        }
    }
    if coords.is_empty() {
        batch.to_vec()
    } else {
        coords
    }
}

/// `Redis`-backed implementation of the fast reserved-seat index.
///
/// # Example
///
/// ```no_run
/// use cinema_redis::RedisFastIndex;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let index = RedisFastIndex::new("redis://127.0.0.1:6379").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisFastIndex {
    conn_manager: ConnectionManager,
}

impl RedisFastIndex {
    /// Connect to `redis_url` and return a ready-to-use index.
    ///
    /// # Errors
    ///
    /// Returns [`FastIndexError::Internal`] if the client cannot be
    /// constructed or the initial connection fails.
    pub async fn new(redis_url: &str) -> Result<Self, FastIndexError> {
        let client =
            Client::open(redis_url).map_err(|e| FastIndexError::Internal(format!("invalid redis url: {e}")))?;
        let conn_manager = ConnectionManager::new(client)
            .await
            .map_err(|e| FastIndexError::Internal(format!("failed to connect to redis: {e}")))?;
        Ok(Self { conn_manager })
    }
}

impl AtomicClaim for RedisFastIndex {
    fn claim(
        &self,
        cinema_key: &str,
        min_distance: i32,
        seats: &[SeatCoord],
    ) -> Pin<Box<dyn Future<Output = Result<ClaimOutcome, FastIndexError>> + Send + '_>> {
        let cinema_key = cinema_key.to_owned();
        let seats: Vec<SeatCoord> = seats.to_vec();
        Box::pin(async move {
            let mut conn = self.conn_manager.clone();
            let mut invocation = reserve_script().await.key(&cinema_key).arg(min_distance);
            for seat in &seats {
                invocation = invocation.arg(seat.field_key());
            }

            let started = Instant::now();
            let result: Result<String, RedisError> = invocation.invoke_async(&mut conn).await;
            match result {
                Ok(_) => {
                    FastIndexMetrics::record_claim(started.elapsed());
                    Ok(ClaimOutcome::Claimed)
                }
                Err(err) => match parse_tagged_error(&err, &seats) {
                    FastIndexError::Conflict(s) => {
                        FastIndexMetrics::record_conflict();
                        Ok(ClaimOutcome::Conflict(s))
                    }
                    FastIndexError::DistanceViolation(s) => {
                        FastIndexMetrics::record_distance_violation();
                        Ok(ClaimOutcome::DistanceViolation(s))
                    }
                    other @ FastIndexError::Internal(_) => {
                        tracing::warn!(cinema_key = %cinema_key, error = %other, "fast index claim failed");
                        Err(other)
                    }
                },
            }
        })
    }
}

impl AtomicRelease for RedisFastIndex {
    fn release(
        &self,
        cinema_key: &str,
        seats: &[SeatCoord],
    ) -> Pin<Box<dyn Future<Output = Result<(), FastIndexError>> + Send + '_>> {
        let cinema_key = cinema_key.to_owned();
        let seats: Vec<SeatCoord> = seats.to_vec();
        Box::pin(async move {
            if seats.is_empty() {
                return Ok(());
            }
            let mut conn = self.conn_manager.clone();
            let mut invocation = cancel_script().await.key(&cinema_key);
            for seat in &seats {
                invocation = invocation.arg(seat.field_key());
            }
            let result = invocation
                .invoke_async::<String>(&mut conn)
                .await
                .map(|_| ())
                .map_err(|e| FastIndexError::Internal(e.to_string()));
            match &result {
                Ok(()) => FastIndexMetrics::record_release(),
                Err(err) => tracing::warn!(cinema_key = %cinema_key, error = %err, "fast index release failed"),
            }
            result
        })
    }
}

impl ReadMembers for RedisFastIndex {
    fn members(
        &self,
        cinema_key: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SeatCoord>, FastIndexError>> + Send + '_>> {
        let cinema_key = cinema_key.to_owned();
        Box::pin(async move {
            let mut conn = self.conn_manager.clone();
            let fields: Vec<String> = conn
                .hkeys(&cinema_key)
                .await
                .map_err(|e| FastIndexError::Internal(e.to_string()))?;
            Ok(fields.into_iter().filter_map(|f| parse_field(&f)).collect())
        })
    }
}

impl SeedIndex for RedisFastIndex {
    fn seed(
        &self,
        cinema_key: &str,
        seats: &[SeatCoord],
    ) -> Pin<Box<dyn Future<Output = Result<(), FastIndexError>> + Send + '_>> {
        let cinema_key = cinema_key.to_owned();
        let seats: Vec<SeatCoord> = seats.to_vec();
        Box::pin(async move {
            let mut conn = self.conn_manager.clone();
            let mut pipe = redis::pipe();
            pipe.atomic().del(&cinema_key).ignore();
            for seat in &seats {
                pipe.hset(&cinema_key, seat.field_key(), "1").ignore();
            }
            pipe.query_async::<()>(&mut conn)
                .await
                .map_err(|e| FastIndexError::Internal(e.to_string()))
        })
    }
}

fn parse_field(field: &str) -> Option<SeatCoord> {
    let mut parts = field.splitn(2, ':');
    let row = parts.next()?.parse().ok()?;
    let column = parts.next()?.parse().ok()?;
    Some(SeatCoord::new(row, column))
}
