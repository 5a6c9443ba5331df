use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, spanned::Spanned, FnArg, GenericArgument, Ident, ItemFn, Pat,
    PathArguments, Signature, Type,
};

/// Transform an asynchronous test into a synchronous one and inject
/// dependencies from a fresh in-memory test server.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`], and
/// `Arc<MemoryLedger>`, `Arc<MemoryRoster>` and `Arc<ScriptedMatcher>`
/// sharing state with that client.
///
/// With `#[backend_test(captured)]`, the example voter is captured before the
/// test runs, so the client already holds an open voting session.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract type information and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Capture the example voter if needed.
    let maybe_capture = match parse_macro_input!(args as Option<Ident>) {
        None => quote! {},
        Some(arg) if arg == "captured" => quote! {
            fixture
                .matcher
                .respond_with(crate::matcher::ScriptedMatcher::single("alice", 0.1))
                .await;

            {
                let response = rocket_client
                    .post("/kiosk/capture")
                    .body(crate::testing::CAPTURED_IMAGE)
                    .dispatch()
                    .await;
                assert_eq!(rocket::http::Status::Ok, response.status());
            }
            assert!(rocket_client
                .cookies()
                .get(crate::model::api::SESSION_COOKIE)
                .is_some());

            fixture.matcher.respond_with(Vec::new()).await;
        },
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected no argument or `captured`")
                .into_compile_error()
                .into();
        }
    };

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// The test itself.
            #item_fn

            crate::testing::init_logging();

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                // Test setup.
                let fixture = crate::testing::Fixture::new().await;
                let rocket_client = fixture.client().await;

                #maybe_capture

                #new_name(#(#test_args),*).await;
            });
        }
    }
    .into()
}

/// Ensure the wrapped test is async, and map each parameter to the fixture
/// value injected for it.
fn check_sig(sig: Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let (Pat::Ident(_), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty) {
                // Valid as the last path segment for any type is itself
                let segment = type_path.path.segments.last().unwrap();
                if segment.ident == "Client" {
                    if has_client {
                        return Err(syn::Error::new(
                            input.span(),
                            "Test cannot accept more than one `rocket::local::asynchronous::Client`",
                        ));
                    }
                    has_client = true;
                    args.push(quote! { rocket_client });
                    continue;
                } else if segment.ident == "Arc" {
                    if let Some(field) = shared_field(&segment.arguments) {
                        args.push(quote! { fixture.#field.clone() });
                        continue;
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client`, `ledger_ident: Arc<MemoryLedger>`, \
`roster_ident: Arc<MemoryRoster>` or `matcher_ident: Arc<ScriptedMatcher>`",
        ));
    }

    Ok(args)
}

/// The fixture field holding the state behind `Arc<T>`, if `T` is injectable.
fn shared_field(arguments: &PathArguments) -> Option<Ident> {
    let PathArguments::AngleBracketed(generics) = arguments else {
        return None;
    };
    let Some(GenericArgument::Type(Type::Path(type_path))) = generics.args.first() else {
        return None;
    };
    let inner = &type_path.path.segments.last()?.ident;
    let field = if inner == "MemoryLedger" {
        "ledger"
    } else if inner == "MemoryRoster" {
        "roster"
    } else if inner == "ScriptedMatcher" {
        "matcher"
    } else {
        return None;
    };
    Some(Ident::new(field, inner.span()))
}
