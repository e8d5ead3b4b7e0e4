//! mirin, a small IRC-style chat server.

fn main() {
    mirin::start();
}
