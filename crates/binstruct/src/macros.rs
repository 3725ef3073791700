/// Define a struct together with its binary layout.
///
/// Each field may carry a layout tag after `=>`:
/// `"<index>[,big|little][,<extraParam>]"`. Untagged fields are neither
/// encoded nor decoded. Tagged field types must implement [`Field`](crate::Field).
///
/// ```
/// use binstruct::{record, CodecConfig, NullString, Padding};
///
/// record! {
///     #[derive(Debug, Default, PartialEq)]
///     pub struct Header {
///         pub magic: u32 => "0,big",
///         pub reserved: Padding => "1,4",
///         pub name: NullString => "2",
///         pub cached: bool,
///     }
/// }
///
/// let header = Header {
///     magic: 0xCAFEBABE,
///     name: NullString::from("hdr"),
///     ..Header::default()
/// };
/// let wire = binstruct::marshal(&header, &CodecConfig::default())?;
/// assert_eq!(wire.as_ref(), b"\xCA\xFE\xBA\xBE\0\0\0\0hdr\0");
///
/// let mut decoded = Header::default();
/// binstruct::unmarshal(&mut wire.as_ref(), &mut decoded, &CodecConfig::default())?;
/// assert_eq!(decoded, header);
/// # Ok::<(), binstruct::CodecError>(())
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_attr:meta])*
                $field_vis:vis $field:ident : $ty:ty $(=> $tag:literal)?
            ),* $(,)?
        }
    ) => {
        $(#[$attr])*
        $vis struct $name {
            $(
                $(#[$field_attr])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::Record for $name {
            fn layout() -> ::std::vec::Vec<$crate::FieldSpec<Self>> {
                ::std::vec![
                    $($(
                        $crate::FieldSpec::<Self>::tagged(
                            ::core::stringify!($field),
                            $tag,
                            |record| $crate::Field::value(&record.$field),
                            |record| $crate::Field::slot(&mut record.$field),
                        ),
                    )?)*
                ]
            }
        }
    };
}
