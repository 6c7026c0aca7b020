use darling::FromAttributes;
use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields};

#[derive(Debug, Default, FromAttributes)]
#[darling(attributes(archive))]
struct ArchiveArgs {
    #[darling(default)]
    awake: bool,
}

/// Generates the field-descriptor schema, and direct `Encodable` /
/// `Decodable` / `Archived` / `Awake` implementations, for a struct or a
/// unit-only enum.
///
/// Structs need `Default` (derive it alongside) since decoding builds the
/// value by constructing a default instance and then populating its fields
/// in schema order — the same path a cyclic reference resolves through.
/// Add `#[archive(awake)]` to skip the generated no-op `Awake` impl and
/// supply your own.
#[proc_macro_derive(Archive, attributes(archive))]
pub fn derive_archive(input: TokenStream) -> TokenStream {
    let item = parse_macro_input!(input as DeriveInput);

    let args = match ArchiveArgs::from_attributes(&item.attrs) {
        Ok(args) => args,
        Err(e) => return TokenStream::from(e.write_errors()),
    };

    match &item.data {
        Data::Struct(data) => derive_struct(&item, data, &args),
        Data::Enum(data) => derive_unit_enum(&item, data),
        Data::Union(_) => syn::Error::new_spanned(&item.ident, "Archive cannot be derived for unions")
            .to_compile_error()
            .into(),
    }
}

fn derive_struct(item: &DeriveInput, data: &syn::DataStruct, args: &ArchiveArgs) -> TokenStream {
    let name = &item.ident;

    let fields = match &data.fields {
        Fields::Named(fields) => &fields.named,
        Fields::Unit => {
            return derive_empty_struct(item, args);
        }
        Fields::Unnamed(_) => {
            return syn::Error::new_spanned(name, "Archive requires named fields")
                .to_compile_error()
                .into();
        }
    };

    let field_descriptors = fields.iter().map(|field| {
        let ident = field.ident.as_ref().expect("named field");
        let name_str = ident.to_string();
        quote! {
            archivist::FieldDescriptor::new(
                #name_str,
                |value: &#name| &value.#ident,
                |value: &mut #name, field| value.#ident = field,
            )
        }
    });

    let awake_impl = if args.awake {
        quote! {}
    } else {
        quote! {
            impl archivist::Awake for #name {
                fn awake(&mut self) {}
            }
        }
    };

    let expanded = quote! {
        impl #name {
            fn __archivist_schema() -> archivist::Schema<#name> {
                vec![ #(#field_descriptors),* ]
            }
        }

        impl archivist::Archived for #name {
            fn encode_body(&self, writer: &mut archivist::Writer) -> archivist::Result<()> {
                archivist::encode_schema(&Self::__archivist_schema(), self, writer)
            }

            fn decode_body(&mut self, reader: &mut archivist::Reader) -> archivist::Result<()> {
                archivist::decode_schema(&Self::__archivist_schema(), self, reader)
            }
        }

        impl archivist::Encodable for #name {
            fn encode(&self, writer: &mut archivist::Writer) -> archivist::Result<()> {
                archivist::Archived::encode_body(self, writer)
            }
        }

        impl archivist::Decodable for #name {
            fn decode(reader: &mut archivist::Reader) -> archivist::Result<Self> {
                let mut value = Self::default();
                archivist::Archived::decode_body(&mut value, reader)?;
                archivist::Awake::awake(&mut value);
                Ok(value)
            }
        }

        #awake_impl
    };

    TokenStream::from(expanded)
}

fn derive_empty_struct(item: &DeriveInput, args: &ArchiveArgs) -> TokenStream {
    let name = &item.ident;

    let awake_impl = if args.awake {
        quote! {}
    } else {
        quote! {
            impl archivist::Awake for #name {
                fn awake(&mut self) {}
            }
        }
    };

    let expanded = quote! {
        impl archivist::Archived for #name {
            fn encode_body(&self, _writer: &mut archivist::Writer) -> archivist::Result<()> {
                Ok(())
            }

            fn decode_body(&mut self, _reader: &mut archivist::Reader) -> archivist::Result<()> {
                Ok(())
            }
        }

        impl archivist::Encodable for #name {
            fn encode(&self, _writer: &mut archivist::Writer) -> archivist::Result<()> {
                Ok(())
            }
        }

        impl archivist::Decodable for #name {
            fn decode(_reader: &mut archivist::Reader) -> archivist::Result<Self> {
                Ok(Self::default())
            }
        }

        #awake_impl
    };

    TokenStream::from(expanded)
}

/// Encodes a unit-only enum as its `i32` discriminant, in declaration order
/// starting at zero (the default Rust discriminant assignment), unless an
/// explicit `= N` override is present on the variant.
fn derive_unit_enum(item: &DeriveInput, data: &syn::DataEnum) -> TokenStream {
    let name = &item.ident;

    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return syn::Error::new_spanned(
                &variant.ident,
                "Archive only supports unit variants on enums",
            )
            .to_compile_error()
            .into();
        }
    }

    let mut next_discriminant: i64 = 0;
    let mut encode_arms = Vec::new();
    let mut decode_arms = Vec::new();

    for variant in &data.variants {
        let variant_ident = &variant.ident;
        let discriminant = if let Some((_, expr)) = &variant.discriminant {
            quote! { (#expr) as i64 }
        } else {
            let value = next_discriminant;
            quote! { #value }
        };
        next_discriminant += 1;

        encode_arms.push(quote! {
            #name::#variant_ident => writer.write_i64(#discriminant),
        });
        decode_arms.push(quote! {
            d if d == (#discriminant) => Ok(#name::#variant_ident),
        });
    }

    let enum_name_str = name.to_string();

    let expanded = quote! {
        impl archivist::Encodable for #name {
            fn encode(&self, writer: &mut archivist::Writer) -> archivist::Result<()> {
                match self {
                    #(#encode_arms)*
                }
            }
        }

        impl archivist::Decodable for #name {
            fn decode(reader: &mut archivist::Reader) -> archivist::Result<Self> {
                let discriminant = reader.read_i64()?;
                match discriminant {
                    #(#decode_arms)*
                    other => Err(archivist::Error::ReadFailed(format!(
                        "{} has no variant with discriminant {}",
                        #enum_name_str, other
                    ))),
                }
            }
        }
    };

    TokenStream::from(expanded)
}
