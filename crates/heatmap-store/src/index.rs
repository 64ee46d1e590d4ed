use std::path::{Path, PathBuf};

use rusqlite::{Connection, ErrorCode, OptionalExtension, params};

use heatmap_core::{Frame, FrameType};

use crate::error::{Result, StoreError};
use crate::schema;

/// Append-only log of rendered frames, unique on `(frame_type, captured_at)`.
///
/// Each append is a single INSERT, so concurrent readers on other
/// connections (WAL mode) never observe a partially written row.
pub struct FrameIndex {
    conn: Connection,
}

impl FrameIndex {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    /// Read-only connection for query paths. It never takes the write lock,
    /// so it does not contend with the writer beyond normal WAL reads.
    pub fn open_reader(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::prepare_reader(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    /// Fails with `DuplicateKey` if a frame of the same type is already
    /// indexed at the same second. The existing row is left untouched.
    pub fn append(&self, frame: &Frame) -> Result<()> {
        let path = frame.file_path.to_str().ok_or_else(|| {
            StoreError::InvalidData(format!(
                "frame path is not valid UTF-8: {}",
                frame.file_path.display()
            ))
        })?;

        let inserted = self.conn.execute(
            "INSERT INTO frame_log (file_path, captured_at, frame_type) VALUES (?1, ?2, ?3)",
            params![path, frame.captured_at, frame.frame_type.as_str()],
        );
        match inserted {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(StoreError::DuplicateKey {
                    frame_type: frame.frame_type,
                    captured_at: frame.captured_at,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Frames with `start <= captured_at <= end`, oldest first. An empty or
    /// inverted range yields an empty vec.
    pub fn range_query(&self, frame_type: FrameType, start: i64, end: i64) -> Result<Vec<Frame>> {
        if start > end {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "SELECT file_path, captured_at FROM frame_log
             WHERE frame_type = ?1 AND captured_at BETWEEN ?2 AND ?3
             ORDER BY captured_at ASC",
        )?;

        stmt.query_map(params![frame_type.as_str(), start, end], |row| {
            Ok(Frame {
                file_path: PathBuf::from(row.get::<_, String>(0)?),
                captured_at: row.get(1)?,
                frame_type,
            })
        })?
        .collect::<std::result::Result<_, _>>()
        .map_err(StoreError::from)
    }

    /// `None` is the normal outcome for a timestamp with no frame.
    pub fn exact_lookup(&self, frame_type: FrameType, captured_at: i64) -> Result<Option<Frame>> {
        let path: Option<String> = self
            .conn
            .query_row(
                "SELECT file_path FROM frame_log WHERE frame_type = ?1 AND captured_at = ?2",
                params![frame_type.as_str(), captured_at],
                |row| row.get(0),
            )
            .optional()?;

        Ok(path.map(|p| Frame {
            file_path: PathBuf::from(p),
            captured_at,
            frame_type,
        }))
    }

    /// Most recent frame of a type.
    pub fn latest(&self, frame_type: FrameType) -> Result<Option<Frame>> {
        let row: Option<(String, i64)> = self
            .conn
            .query_row(
                "SELECT file_path, captured_at FROM frame_log
                 WHERE frame_type = ?1 ORDER BY captured_at DESC LIMIT 1",
                [frame_type.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(row.map(|(p, captured_at)| Frame {
            file_path: PathBuf::from(p),
            captured_at,
            frame_type,
        }))
    }

    pub fn count(&self, frame_type: FrameType) -> Result<u64> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM frame_log WHERE frame_type = ?1",
            [frame_type.as_str()],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }

    /// Flush the WAL into the main database file.
    pub fn checkpoint_truncate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}
