#[cfg(test)]
mod scan;
#[cfg(test)]
mod util;
