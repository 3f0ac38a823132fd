mod app;
mod entry;
mod logger;
mod shutdown_handlers;

use salvo::error::AppResult;

fn main() -> AppResult<()> {
    entry::run()
}
