//! Browser front end of the font inspector: implements the page access the
//! core needs on top of `web_sys`, wires page events into the controller and
//! draws the overlay.

mod bridge;
mod dom;
mod listeners;
mod start;

type Res<T> = Result<T, String>;

fn err<T, S: ToString>(s: S) -> Res<T> {
    Err(s.to_string())
}
