use crate::db::models::Record;
use crate::error::Error;
use tokio::sync::RwLock;

/// Process-lifetime table of records, kept in insertion order
pub struct Collection<T: Record> {
    rows: RwLock<Vec<T>>,
}

/// Identifier for the next record: one past the largest in use, or 1 when empty
pub fn next_id<T: Record>(rows: &[T]) -> i64 {
    rows.iter().map(Record::id).max().map_or(1, |max| max + 1)
}

impl<T: Record> Collection<T> {
    pub fn new(rows: Vec<T>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Snapshot of every record
    pub async fn all(&self) -> Vec<T> {
        self.rows.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn find(&self, id: i64) -> Option<T> {
        self.rows.read().await.iter().find(|row| row.id() == id).cloned()
    }

    pub async fn contains(&self, id: i64) -> bool {
        self.rows.read().await.iter().any(|row| row.id() == id)
    }

    pub async fn get(&self, id: i64) -> Result<T, Error> {
        self.find(id).await.ok_or_else(|| not_found::<T>(id))
    }

    /// Append a record built around a freshly assigned identifier
    pub async fn insert_with<F>(&self, build: F) -> T
    where
        F: FnOnce(i64) -> T,
    {
        let mut rows = self.rows.write().await;
        let record = build(next_id(&rows));
        rows.push(record.clone());
        record
    }

    /// Mutate the record with `id` in place and return its new state
    pub async fn update_with<F>(&self, id: i64, apply: F) -> Result<T, Error>
    where
        F: FnOnce(&mut T),
    {
        let mut rows = self.rows.write().await;
        let row = rows
            .iter_mut()
            .find(|row| row.id() == id)
            .ok_or_else(|| not_found::<T>(id))?;
        apply(row);
        Ok(row.clone())
    }

    pub async fn remove(&self, id: i64) -> Result<T, Error> {
        let mut rows = self.rows.write().await;
        let index = rows
            .iter()
            .position(|row| row.id() == id)
            .ok_or_else(|| not_found::<T>(id))?;
        Ok(rows.remove(index))
    }
}

fn not_found<T: Record>(id: i64) -> Error {
    Error::NotFound(format!("{} not found: {}", T::KIND, id))
}
