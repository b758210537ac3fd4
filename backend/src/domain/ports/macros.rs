//! Helper macro generating port error enums with snake_case constructors.
//!
//! `Query { message: String }` yields `Error::query(impl Into<String>)`, so
//! adapters can write `RepositoryError::query(err.to_string())`.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        define_port_error!(@ctor_impl $variant () () $( $field : $ty, )*);
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) ) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]($($params)*) -> Self {
                Self::$variant { $($inits)* }
            }
        }
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) $field:ident : $ty:ty, $($rest:tt)*) => {
        define_port_error!(
            @ctor_impl
            $variant
            ($($params)* $field: impl Into<$ty>,)
            ($($inits)* $field: $field.into(),)
            $($rest)*
        );
    };
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    define_port_error! {
        pub enum SamplePortError {
            Offline => "offline",
            Rejected { reason: String } => "rejected: {reason}",
            Throttled { retry_after_secs: u64 } => "retry in {retry_after_secs}s",
            Partial { message: String, sent: u32 } => "{message} ({sent} sent)",
        }
    }

    #[test]
    fn unit_variants_get_nullary_constructors() {
        assert_eq!(SamplePortError::offline(), SamplePortError::Offline);
    }

    #[test]
    fn constructors_accept_str_for_string_fields() {
        let err = SamplePortError::rejected("bad signature");
        assert_eq!(err.to_string(), "rejected: bad signature");
    }

    #[test]
    fn constructors_preserve_non_string_types() {
        let err = SamplePortError::throttled(30_u64);
        assert_eq!(err.to_string(), "retry in 30s");
    }

    #[test]
    fn constructors_support_mixed_fields() {
        let err = SamplePortError::partial("push delivered", 3_u32);
        assert_eq!(err.to_string(), "push delivered (3 sent)");
    }
}
