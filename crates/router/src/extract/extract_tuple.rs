use crate::body::ResponseBody;
use crate::extract::from_request::FromRequest;
use crate::responder::Responder;
use crate::RequestContext;
use http::Response;

/// Extracts the elements in order, the first failure is answered as the response.
macro_rules! impl_from_request_for_tuple ({ $($param:ident)* } => {
    impl<$($param,)*> FromRequest for ($($param,)*)
    where
        $($param: FromRequest,)*
    {
        type Error = Response<ResponseBody>;

        fn from_request(ctx: &RequestContext) -> Result<Self, Self::Error> {
            Ok(($($param::from_request(ctx).map_err(|e| e.response_to(ctx))?,)*))
        }
    }
});

impl_from_request_for_tuple! { A }
impl_from_request_for_tuple! { A B }
impl_from_request_for_tuple! { A B C }
impl_from_request_for_tuple! { A B C D }
impl_from_request_for_tuple! { A B C D E }
impl_from_request_for_tuple! { A B C D E F }
impl_from_request_for_tuple! { A B C D E F G }
impl_from_request_for_tuple! { A B C D E F G H }
impl_from_request_for_tuple! { A B C D E F G H I }
impl_from_request_for_tuple! { A B C D E F G H I J }
impl_from_request_for_tuple! { A B C D E F G H I J K }
impl_from_request_for_tuple! { A B C D E F G H I J K L }
