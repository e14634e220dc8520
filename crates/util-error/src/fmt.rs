use std::error::Error;
use std::fmt;

/// Single-line rendering of an error together with its whole source chain
///
/// Used for log fields and for failure reasons recorded in events, where
/// multi-line `{:#?}` output would be unreadable.
pub struct FmtCompactError<'e, E: ?Sized>(&'e E);

impl<E> fmt::Display for FmtCompactError<'_, E>
where
    E: Error + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)?;

        let mut source = self.0.source();
        while let Some(err) = source {
            f.write_str(": ")?;
            fmt::Display::fmt(err, f)?;
            source = err.source();
        }

        Ok(())
    }
}

pub trait FmtCompact {
    fn fmt_compact(&self) -> FmtCompactError<'_, Self>;
}

impl<E> FmtCompact for E
where
    E: Error + ?Sized,
{
    fn fmt_compact(&self) -> FmtCompactError<'_, Self> {
        FmtCompactError(self)
    }
}
