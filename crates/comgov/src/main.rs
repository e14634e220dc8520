use comgov::Comgov;
use comgov_util_error::WhateverResult;

#[tokio::main]
#[snafu::report]
async fn main() -> WhateverResult<()> {
    Comgov::builder().run().await?;
    Ok(())
}
