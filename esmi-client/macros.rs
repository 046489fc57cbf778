//! Declarative macros for the fixed lookup tables of the HSMP interface

/// Define an enum with automatic `name()` and `all()` implementations
///
/// # Example
/// ```
/// use esmi::name_enum;
///
/// name_enum! {
///     pub enum Rail {
///         Vddcr => "VDDCR",
///         Vddio => "VDDIO",
///     }
/// }
///
/// assert_eq!(Rail::Vddio.name(), "VDDIO");
/// assert_eq!(Rail::all().len(), 2);
/// ```
#[macro_export]
macro_rules! name_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident => $str:literal),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant,)*
        }

        impl $name {
            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $str,)*
                }
            }

            pub fn all() -> Vec<$name> {
                vec![$($name::$variant,)*]
            }
        }
    };
}

/// Define an enum with name() and all() methods, plus custom data per variant
///
/// # Example
/// ```
/// use esmi::enum_with_data;
///
/// enum_with_data! {
///     pub enum LinkRate: u32 {
///         Auto => ("auto", 0),
///         Gen4 => ("gen4", 1),
///     }
///     impl encoding -> u32
/// }
///
/// let rate = LinkRate::Gen4;
/// assert_eq!(rate.name(), "gen4");
/// assert_eq!(rate.encoding(), 1);
/// assert_eq!(LinkRate::all().len(), 2);
/// ```
#[macro_export]
macro_rules! enum_with_data {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident: $data_type:ty {
            $($variant:ident => ($str:literal, $data:expr)),* $(,)?
        }
        impl $method:ident -> $return_type:ty
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant,)*
        }

        impl $name {
            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $str,)*
                }
            }

            pub fn $method(&self) -> $return_type {
                match self {
                    $($name::$variant => $data,)*
                }
            }

            pub fn all() -> Vec<$name> {
                vec![$($name::$variant,)*]
            }
        }
    };
}
