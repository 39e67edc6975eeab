use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{Ident, ItemFn, LitStr, ReturnType, parse_macro_input};

fn static_name(prefix: &str, func: &ItemFn) -> Ident {
    let fn_name_upper = func.sig.ident.to_string().to_uppercase();
    Ident::new(&format!("_{prefix}_{fn_name_upper}"), Span::call_site())
}

fn check_signature(func: &ItemFn) -> syn::Result<()> {
    let sig = &func.sig;
    if !sig.inputs.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.inputs,
            "component constructors take no arguments",
        ));
    }
    if sig.asyncness.is_some() {
        return Err(syn::Error::new_spanned(
            sig.asyncness,
            "component constructors must be synchronous",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "component constructors cannot be generic",
        ));
    }
    if matches!(sig.output, ReturnType::Default) {
        return Err(syn::Error::new_spanned(
            &sig.ident,
            "component constructors must return `HandlerInstance`",
        ));
    }
    Ok(())
}

/// Implementation of `#[scene("id")]`.
///
/// Leaves the constructor unchanged and appends a
/// `#[::stagehand_framework::linkme::distributed_slice]` static registering
/// it in `SCENE_COMPONENTS`.
pub fn scene(attr: TokenStream, item: TokenStream) -> TokenStream {
    let scene_id = parse_macro_input!(attr as LitStr);
    let func = parse_macro_input!(item as ItemFn);

    if scene_id.value().is_empty() {
        return syn::Error::new(scene_id.span(), "scene id cannot be empty")
            .into_compile_error()
            .into();
    }
    if let Err(err) = check_signature(&func) {
        return err.into_compile_error().into();
    }

    let fn_name = &func.sig.ident;
    let static_name = static_name("SCENE_COMPONENT", &func);

    quote! {
        #func

        #[::stagehand_framework::linkme::distributed_slice(::stagehand_framework::SCENE_COMPONENTS)]
        #[linkme(crate = ::stagehand_framework::linkme)]
        static #static_name: ::stagehand_framework::SceneComponent =
            ::stagehand_framework::SceneComponent::from_fn(#scene_id, #fn_name);
    }
    .into()
}

/// Implementation of `#[update_component]`.
pub fn update_component(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(Span::call_site(), "`#[update_component]` takes no arguments")
            .into_compile_error()
            .into();
    }
    let func = parse_macro_input!(item as ItemFn);
    if let Err(err) = check_signature(&func) {
        return err.into_compile_error().into();
    }

    let fn_name = &func.sig.ident;
    let static_name = static_name("UPDATE_COMPONENT", &func);

    quote! {
        #func

        #[::stagehand_framework::linkme::distributed_slice(::stagehand_framework::UPDATE_COMPONENTS)]
        #[linkme(crate = ::stagehand_framework::linkme)]
        static #static_name: ::stagehand_framework::UpdateComponent =
            ::stagehand_framework::UpdateComponent::from_fn(#fn_name);
    }
    .into()
}
