//! Native value kinds and the fixed SQL type mapping.

/// The underlying scalar kind of a column before SQL type mapping.
///
/// This is a closed set: both the SQL mapping and the numeric/categorical
/// profiling split match exhaustively over it, so adding a variant forces
/// every policy decision to be revisited at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeValueKind {
    Int64,
    Int32,
    Float64,
    Float32,
    Boolean,
    Timestamp,
    Duration,
    Text,
    Categorical,
}

impl NativeValueKind {
    /// Map this kind to its destination SQL type name.
    ///
    /// Total by construction. `Text` and `Categorical` are the TEXT bucket;
    /// that is the single sanctioned fallback for anything without a more
    /// specific SQL representation.
    pub fn sql_type(self) -> &'static str {
        match self {
            NativeValueKind::Int64 => "BIGINT",
            NativeValueKind::Int32 => "INTEGER",
            NativeValueKind::Float64 => "DOUBLE PRECISION",
            NativeValueKind::Float32 => "REAL",
            NativeValueKind::Boolean => "BOOLEAN",
            NativeValueKind::Timestamp => "TIMESTAMP",
            NativeValueKind::Duration => "INTERVAL",
            NativeValueKind::Text | NativeValueKind::Categorical => "TEXT",
        }
    }

    /// Whether the profile for this kind is a numeric [min, max] range.
    ///
    /// Everything else is profiled as an enumeration of distinct values.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            NativeValueKind::Int64
                | NativeValueKind::Int32
                | NativeValueKind::Float64
                | NativeValueKind::Float32
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [NativeValueKind; 9] = [
        NativeValueKind::Int64,
        NativeValueKind::Int32,
        NativeValueKind::Float64,
        NativeValueKind::Float32,
        NativeValueKind::Boolean,
        NativeValueKind::Timestamp,
        NativeValueKind::Duration,
        NativeValueKind::Text,
        NativeValueKind::Categorical,
    ];

    #[test]
    fn sql_mapping_matches_fixed_table() {
        assert_eq!(NativeValueKind::Int64.sql_type(), "BIGINT");
        assert_eq!(NativeValueKind::Int32.sql_type(), "INTEGER");
        assert_eq!(NativeValueKind::Float64.sql_type(), "DOUBLE PRECISION");
        assert_eq!(NativeValueKind::Float32.sql_type(), "REAL");
        assert_eq!(NativeValueKind::Boolean.sql_type(), "BOOLEAN");
        assert_eq!(NativeValueKind::Timestamp.sql_type(), "TIMESTAMP");
        assert_eq!(NativeValueKind::Duration.sql_type(), "INTERVAL");
        assert_eq!(NativeValueKind::Text.sql_type(), "TEXT");
        assert_eq!(NativeValueKind::Categorical.sql_type(), "TEXT");
    }

    #[test]
    fn mapping_is_total_over_every_kind() {
        for kind in ALL {
            assert!(!kind.sql_type().is_empty());
        }
    }

    #[test]
    fn only_integer_and_float_kinds_are_numeric() {
        for kind in ALL {
            let expected = matches!(
                kind,
                NativeValueKind::Int64
                    | NativeValueKind::Int32
                    | NativeValueKind::Float64
                    | NativeValueKind::Float32
            );
            assert_eq!(kind.is_numeric(), expected, "{kind:?}");
        }
    }
}
