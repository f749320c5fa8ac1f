use crate::sql::error::DbError;
use async_trait::async_trait;
use engine_core::scope::Resource;
use mysql_async::Conn;
use tracing::trace;

/// One checked-out MySQL connection.
///
/// Released by [`Resource::release`], which closes the connection. A session
/// that is simply dropped hands its connection back to the pool instead.
pub struct MySqlSession {
    conn: Conn,
}

impl MySqlSession {
    pub fn new(conn: Conn) -> Self {
        Self { conn }
    }

    pub fn conn(&mut self) -> &mut Conn {
        &mut self.conn
    }

    pub fn id(&self) -> u32 {
        self.conn.id()
    }
}

#[async_trait]
impl Resource for MySqlSession {
    type Error = DbError;

    async fn release(self) -> Result<(), DbError> {
        let id = self.conn.id();
        self.conn.disconnect().await?;
        trace!("Closed MySQL connection {}", id);
        Ok(())
    }
}
