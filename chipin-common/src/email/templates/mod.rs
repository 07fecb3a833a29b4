use std::time::Duration;

pub struct CoManagerInviteMessage {}

impl CoManagerInviteMessage {
    pub fn generate(
        event_title: &str,
        redeem_url: &str,
        token: &str,
        token_lifetime: Duration,
    ) -> String {
        let link = format!("{}?InvitationToken={}", redeem_url, token);

        format!(
            "<html>
               <head>
                 <style>
                   body {{
                     font-family: Arial, sans-serif;
                     text-align: center;
                   }}
                 </style>
               </head>
             <body>
               <h1>You've been invited to help manage \"{}\"</h1>
               <p>Clicking the link below will make you a co-manager of this \
               event. Co-managers can approve contributions, log expenses, and \
               invite other managers.</p>
               <p><a href=\"{}\" rel=\"nofollow\">Accept the invitation</a></p>
               <p><b>This link can be used once and expires in {} minutes.</b></p>
               <br />
               <p><i>Not expecting this? Just ignore this email and don't click \
               the link.</i></p>
             </body>
             </html>",
            event_title,
            link,
            token_lifetime.as_secs() / 60,
        )
    }
}
