//! Client half of the sign-in and table exchange

use crate::auth::{encode_password, encode_username, to_field};
use crate::cipher::CipherTable;
use crate::error::{Result, TunnelError};
use crate::helper::{read_array, write_field};
use crate::protocol::{SUCCESS, VERDICT_LEN};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

/// Present credentials to the relay and wait for its verdict
pub async fn sign_in<S>(stream: &mut S, username: &str, password: &str) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    write_field(stream, &to_field(&encode_username(username))).await?;
    write_field(stream, &to_field(&encode_password(password))).await?;

    let verdict = read_array::<VERDICT_LEN, _>(stream).await?;
    if verdict != SUCCESS {
        return Err(TunnelError::Auth(format!(
            "relay rejected credentials for {}",
            username
        )));
    }

    debug!("Signed in as {}", username);
    Ok(())
}

/// Send the encode table, then the decode table, in the clear
pub async fn send_table<S>(stream: &mut S, table: &CipherTable) -> Result<()>
where
    S: AsyncWrite + Unpin + ?Sized,
{
    write_field(stream, table.encode_table()).await?;
    write_field(stream, table.decode_table()).await?;
    Ok(())
}
